/// Text files in the encodings used by MSTS content, and directory listing
use std::fs;
use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};

use crate::error::{Error, Result};

const UTF8_BOM: [u8; 3] = [0xef, 0xbb, 0xbf];
const UTF16LE_BOM: [u8; 2] = [0xff, 0xfe];
const UTF16BE_BOM: [u8; 2] = [0xfe, 0xff];

/// Text encoding of a file. UTF-16 files are always written with a BOM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    #[default]
    Utf8,
    Utf8Bom,
    Utf16Le,
    Utf16Be,
}

impl Encoding {
    /// Detect by byte order mark, falling back to zero bytes in the first
    /// code unit for UTF-16 without one
    pub fn detect(bytes: &[u8]) -> Encoding {
        if bytes.starts_with(&UTF8_BOM) {
            Encoding::Utf8Bom
        } else if bytes.starts_with(&UTF16LE_BOM) {
            Encoding::Utf16Le
        } else if bytes.starts_with(&UTF16BE_BOM) {
            Encoding::Utf16Be
        } else {
            match bytes {
                [lo, 0, ..] if *lo != 0 => Encoding::Utf16Le,
                [0, hi, ..] if *hi != 0 => Encoding::Utf16Be,
                _ => Encoding::Utf8,
            }
        }
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<String> {
        match self {
            Encoding::Utf8 | Encoding::Utf8Bom => {
                let body = bytes.strip_prefix(&UTF8_BOM).unwrap_or(bytes);
                String::from_utf8(body.to_vec()).map_err(|e| Error::Encoding(e.to_string()))
            }
            Encoding::Utf16Le => decode_utf16(
                bytes.strip_prefix(&UTF16LE_BOM).unwrap_or(bytes),
                u16::from_le_bytes,
            ),
            Encoding::Utf16Be => decode_utf16(
                bytes.strip_prefix(&UTF16BE_BOM).unwrap_or(bytes),
                u16::from_be_bytes,
            ),
        }
    }

    pub fn encode(&self, text: &str) -> Vec<u8> {
        match self {
            Encoding::Utf8 => text.as_bytes().to_vec(),
            Encoding::Utf8Bom => [&UTF8_BOM[..], text.as_bytes()].concat(),
            Encoding::Utf16Le => {
                let mut bytes = UTF16LE_BOM.to_vec();
                bytes.extend(text.encode_utf16().flat_map(u16::to_le_bytes));
                bytes
            }
            Encoding::Utf16Be => {
                let mut bytes = UTF16BE_BOM.to_vec();
                bytes.extend(text.encode_utf16().flat_map(u16::to_be_bytes));
                bytes
            }
        }
    }
}

fn decode_utf16(bytes: &[u8], unit: fn([u8; 2]) -> u16) -> Result<String> {
    if bytes.len() % 2 != 0 {
        return Err(Error::Encoding("odd number of bytes in UTF-16 text".into()));
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| unit([pair[0], pair[1]]))
        .collect();
    String::from_utf16(&units).map_err(|e| Error::Encoding(e.to_string()))
}

/// Split a file name off a path, as (directory, file name)
pub(crate) fn split_path(path: &Path) -> Result<(PathBuf, String)> {
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| Error::WrongFileKind(path.display().to_string()))?
        .to_string();
    let directory = path.parent().map(Path::to_path_buf).unwrap_or_default();
    Ok((directory, filename))
}

pub(crate) fn is_shape_filename(filename: &str) -> bool {
    Path::new(filename)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("s"))
}

/// A text file held as lines, saved back in its original encoding
#[derive(Debug, Clone, PartialEq)]
pub struct TextFile {
    filename: String,
    directory: PathBuf,
    encoding: Encoding,
    lines: Vec<String>,
    line_ending: &'static str,
}

impl TextFile {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let (directory, filename) = split_path(path)?;
        let bytes = fs::read(path)?;
        let encoding = Encoding::detect(&bytes);
        let text = encoding.decode(&bytes)?;
        let line_ending = if text.contains("\r\n") { "\r\n" } else { "\n" };
        let lines = text
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
            .collect();
        tracing::info!(path = %path.display(), ?encoding, "Loaded text file");
        Ok(Self {
            filename,
            directory,
            encoding,
            lines,
            line_ending,
        })
    }

    pub fn save(&self) -> Result<()> {
        let text = self.lines.join(self.line_ending);
        fs::write(self.filepath(), self.encoding.encode(&text))?;
        tracing::info!(path = %self.filepath().display(), "Saved text file");
        Ok(())
    }

    /// Copy the file on disk and return the copy. Without a directory the
    /// copy lands next to the original.
    pub fn copy(&self, new_filename: &str, new_directory: Option<&Path>) -> Result<TextFile> {
        let directory = new_directory.map_or_else(|| self.directory.clone(), Path::to_path_buf);
        let target = directory.join(new_filename);
        fs::copy(self.filepath(), &target)?;
        Ok(TextFile {
            filename: new_filename.to_string(),
            directory,
            ..self.clone()
        })
    }

    /// Literal replacement in every line, returning the number of matches
    pub fn replace(&mut self, search: &str, replacement: &str) -> usize {
        if search.is_empty() {
            return 0;
        }
        let mut count = 0;
        for line in &mut self.lines {
            let matches = line.matches(search).count();
            if matches > 0 {
                *line = line.replace(search, replacement);
                count += matches;
            }
        }
        count
    }

    /// Like [`TextFile::replace`] but ignoring ASCII case
    pub fn replace_ignorecase(&mut self, search: &str, replacement: &str) -> usize {
        let mut count = 0;
        for line in &mut self.lines {
            let (replaced, matches) = replace_ascii_ignorecase(line, search, replacement);
            if matches > 0 {
                *line = replaced;
                count += matches;
            }
        }
        count
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn filepath(&self) -> PathBuf {
        self.directory.join(&self.filename)
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn lines_mut(&mut self) -> &mut Vec<String> {
        &mut self.lines
    }
}

/// Load any text file except shapes, which go through
/// [`crate::shapefile::ShapeFile`]
pub fn load_file(path: impl AsRef<Path>) -> Result<TextFile> {
    let path = path.as_ref();
    let (_, filename) = split_path(path)?;
    if is_shape_filename(&filename) {
        return Err(Error::WrongFileKind(format!(
            "{} is a shape, load it as one",
            filename
        )));
    }
    TextFile::load(path)
}

/// ASCII case-insensitive literal replacement, returning the new text and
/// the number of matches
pub(crate) fn replace_ascii_ignorecase(text: &str, search: &str, replacement: &str) -> (String, usize) {
    if search.is_empty() {
        return (text.to_string(), 0);
    }
    let lowered = text.to_ascii_lowercase();
    let needle = search.to_ascii_lowercase();
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    let mut count = 0;
    for (start, _) in lowered.match_indices(&needle) {
        out.push_str(&text[last..start]);
        out.push_str(replacement);
        last = start + needle.len();
        count += 1;
    }
    out.push_str(&text[last..]);
    (out, count)
}

/// Names of the files in `directory` matching any include pattern and no
/// exclude pattern, sorted. Matching ignores case.
pub fn find_directory_files(
    directory: impl AsRef<Path>,
    include: &[&str],
    exclude: &[&str],
) -> Result<Vec<String>> {
    let compile = |patterns: &[&str]| -> Result<Vec<Pattern>> {
        patterns
            .iter()
            .map(|p| Pattern::new(p).map_err(Error::from))
            .collect()
    };
    let include = compile(include)?;
    let exclude = compile(exclude)?;
    let options = MatchOptions {
        case_sensitive: false,
        ..MatchOptions::new()
    };

    let mut names = Vec::new();
    for entry in fs::read_dir(directory.as_ref())? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        let included = include.iter().any(|p| p.matches_with(&name, options));
        let excluded = exclude.iter().any(|p| p.matches_with(&name, options));
        if included && !excluded {
            names.push(name);
        }
    }
    names.sort();
    tracing::debug!(directory = %directory.as_ref().display(), found = names.len(), "Listed files");
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_encoding() {
        assert_eq!(Encoding::detect(b"\xff\xfeS\0"), Encoding::Utf16Le);
        assert_eq!(Encoding::detect(b"\xfe\xff\0S"), Encoding::Utf16Be);
        assert_eq!(Encoding::detect(b"\xef\xbb\xbfSIMIS"), Encoding::Utf8Bom);
        assert_eq!(Encoding::detect(b"S\0I\0"), Encoding::Utf16Le);
        assert_eq!(Encoding::detect(b"SIMIS"), Encoding::Utf8);
        assert_eq!(Encoding::detect(b""), Encoding::Utf8);
    }

    #[test]
    fn test_utf16_round_trip_keeps_bom() {
        let bytes = Encoding::Utf16Le.encode("shape ( )");
        assert!(bytes.starts_with(&UTF16LE_BOM));
        assert_eq!(Encoding::detect(&bytes), Encoding::Utf16Le);
        assert_eq!(Encoding::Utf16Le.decode(&bytes).unwrap(), "shape ( )");
        assert!(matches!(
            Encoding::Utf16Le.decode(&[0xff, 0xfe, 0x41]),
            Err(Error::Encoding(_))
        ));
    }

    #[test]
    fn test_replace_ignorecase() {
        let (text, count) = replace_ascii_ignorecase("A1t10mStrt.ace a1T10MSTRT.s", "a1t10mstrt", "x");
        assert_eq!(text, "x.ace x.s");
        assert_eq!(count, 2);
        assert_eq!(replace_ascii_ignorecase("abc", "", "x"), ("abc".to_string(), 0));
    }

    #[test]
    fn test_text_file_replace_save_and_copy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("track.sd");
        fs::write(&path, Encoding::Utf16Le.encode("shape ( A1t10mStrt.s )\r\nESD_Bounding_Box\r\n")).unwrap();

        let mut file = load_file(&path).unwrap();
        assert_eq!(file.encoding(), Encoding::Utf16Le);
        assert_eq!(file.lines()[0], "shape ( A1t10mStrt.s )");
        assert_eq!(file.replace("A1t10mStrt", "A1t10mStrt_v2"), 1);
        assert_eq!(file.replace_ignorecase("esd_bounding_box", "ESD_Box"), 1);
        file.save().unwrap();

        let copy = file.copy("copy.sd", None).unwrap();
        assert_eq!(copy.filepath(), dir.path().join("copy.sd"));
        let reloaded = TextFile::load(copy.filepath()).unwrap();
        assert_eq!(reloaded.lines(), file.lines());
        assert_eq!(reloaded.encoding(), Encoding::Utf16Le);
    }

    #[test]
    fn test_load_file_rejects_shapes() {
        assert!(matches!(load_file("route/shapes/a.S"), Err(Error::WrongFileKind(_))));
    }

    #[test]
    fn test_find_directory_files() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["A1t10mStrt.s", "A1t10mStrt.sd", "A2t10mStrt.s", "readme.txt"] {
            fs::write(dir.path().join(name), "").unwrap();
        }
        fs::create_dir(dir.path().join("sub.s")).unwrap();

        let found = find_directory_files(dir.path(), &["*.s"], &["a2*"]).unwrap();
        assert_eq!(found, vec!["A1t10mStrt.s".to_string()]);
        assert!(matches!(
            find_directory_files(dir.path(), &["[*.s"], &[]),
            Err(Error::Pattern(_))
        ));
    }
}

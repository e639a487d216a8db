/// Shape files on disk and their compression state
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{Error, Result};
use crate::file::{is_shape_filename, replace_ascii_ignorecase, split_path, Encoding};
use crate::shape::{Shape, DEFAULT_VALUES_PER_LINE};

/// Header of a decompressed text shape
pub const SHAPE_TEXT_HEADER: &str = "SIMISA@@@@@@@@@@JINX0s1t______";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionState {
    Compressed,
    Decompressed,
    /// Empty or newly created file
    Unknown,
}

/// A `.s` file. The shape is only readable while decompressed.
#[derive(Debug, Clone)]
pub struct ShapeFile {
    filename: String,
    directory: PathBuf,
    encoding: Encoding,
    state: CompressionState,
    shape: Option<Shape>,
    values_per_line: usize,
}

impl ShapeFile {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::load_with(path, DEFAULT_VALUES_PER_LINE)
    }

    /// Load with a custom index list width for rendering
    pub fn load_with(path: impl AsRef<Path>, values_per_line: usize) -> Result<Self> {
        let (directory, filename) = split_path(path.as_ref())?;
        if !is_shape_filename(&filename) {
            return Err(Error::WrongFileKind(format!("{} is not a shape", filename)));
        }
        let mut file = Self {
            filename,
            directory,
            encoding: Encoding::default(),
            state: CompressionState::Unknown,
            shape: None,
            values_per_line,
        };
        file.reload()?;
        Ok(file)
    }

    /// Re-read the file, detecting its encoding and compression state
    pub fn reload(&mut self) -> Result<()> {
        let path = self.filepath();
        let bytes = fs::read(&path)?;
        self.encoding = Encoding::detect(&bytes);
        self.shape = None;
        self.state = if bytes.is_empty() {
            CompressionState::Unknown
        } else {
            match self.encoding.decode(&bytes) {
                Ok(text) if has_text_header(&text) => {
                    let mut shape = Shape::parse(&text)?;
                    shape.set_values_per_line(self.values_per_line);
                    self.shape = Some(shape);
                    CompressionState::Decompressed
                }
                _ => CompressionState::Compressed,
            }
        };
        tracing::info!(path = %path.display(), state = ?self.state, encoding = ?self.encoding, "Loaded shape file");
        Ok(())
    }

    pub fn state(&self) -> CompressionState {
        self.state
    }

    pub fn is_compressed(&self) -> bool {
        self.state == CompressionState::Compressed
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
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

    pub fn shape(&self) -> Result<&Shape> {
        match (&self.shape, self.state) {
            (_, CompressionState::Compressed) => Err(Error::AccessDeniedWhileCompressed),
            (Some(shape), _) => Ok(shape),
            (None, _) => Err(Error::malformed(1, "empty shape file")),
        }
    }

    pub fn shape_mut(&mut self) -> Result<&mut Shape> {
        match (&mut self.shape, self.state) {
            (_, CompressionState::Compressed) => Err(Error::AccessDeniedWhileCompressed),
            (Some(shape), _) => Ok(shape),
            (None, _) => Err(Error::malformed(1, "empty shape file")),
        }
    }

    /// Current document lines, including unsaved edits
    pub fn lines(&self) -> Result<Vec<String>> {
        match self.state {
            CompressionState::Compressed => Err(Error::AccessDeniedWhileCompressed),
            CompressionState::Unknown => Ok(Vec::new()),
            CompressionState::Decompressed => {
                let text = self.shape()?.render();
                Ok(text
                    .split('\n')
                    .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
                    .collect())
            }
        }
    }

    /// Write the rendered shape back in the file's encoding
    pub fn save(&self) -> Result<()> {
        let text = self.shape()?.render();
        fs::write(self.filepath(), self.encoding.encode(&text))?;
        tracing::info!(path = %self.filepath().display(), "Saved shape file");
        Ok(())
    }

    /// Copy the file on disk. Unsaved edits are carried over in memory.
    pub fn copy(&self, new_filename: &str, new_directory: Option<&Path>) -> Result<ShapeFile> {
        if !is_shape_filename(new_filename) {
            return Err(Error::WrongFileKind(format!("{} is not a shape", new_filename)));
        }
        let directory = new_directory.map_or_else(|| self.directory.clone(), Path::to_path_buf);
        fs::copy(self.filepath(), directory.join(new_filename))?;
        Ok(ShapeFile {
            filename: new_filename.to_string(),
            directory,
            ..self.clone()
        })
    }

    /// Literal text replacement over the whole document, which is then
    /// parsed again. Returns the number of matches.
    pub fn replace(&mut self, search: &str, replacement: &str) -> Result<usize> {
        let text = self.shape()?.render();
        let count = if search.is_empty() { 0 } else { text.matches(search).count() };
        if count > 0 {
            self.reparse(&text.replace(search, replacement))?;
        }
        Ok(count)
    }

    /// Like [`ShapeFile::replace`] but ignoring ASCII case
    pub fn replace_ignorecase(&mut self, search: &str, replacement: &str) -> Result<usize> {
        let text = self.shape()?.render();
        let (replaced, count) = replace_ascii_ignorecase(&text, search, replacement);
        if count > 0 {
            self.reparse(&replaced)?;
        }
        Ok(count)
    }

    fn reparse(&mut self, text: &str) -> Result<()> {
        let mut shape = Shape::parse(text)?;
        shape.set_values_per_line(self.values_per_line);
        self.shape = Some(shape);
        Ok(())
    }

    /// Compress with the external tool. Unsaved edits are discarded.
    pub fn compress(&mut self, tool: impl AsRef<Path>) -> Result<()> {
        if self.state == CompressionState::Compressed {
            tracing::debug!(path = %self.filepath().display(), "Already compressed");
            return Ok(());
        }
        self.run_tool(tool.as_ref(), false)
    }

    /// Decompress with the external tool
    pub fn decompress(&mut self, tool: impl AsRef<Path>) -> Result<()> {
        if self.state == CompressionState::Decompressed {
            tracing::debug!(path = %self.filepath().display(), "Already decompressed");
            return Ok(());
        }
        self.run_tool(tool.as_ref(), true)
    }

    fn run_tool(&mut self, tool: &Path, decompress: bool) -> Result<()> {
        let path = self.filepath();
        let mut command = Command::new(tool);
        command.arg(&path);
        if decompress {
            command.arg("/u");
        }
        command.arg(format!("/o:{}", path.display()));

        tracing::info!(tool = %tool.display(), path = %path.display(), decompress, "Running shape tool");
        let status = command.status()?;
        if !status.success() {
            return Err(Error::ExternalTool {
                tool: tool.to_path_buf(),
                file: path,
                status: status.code(),
            });
        }
        self.reload()
    }
}

/// Load a shape file, rejecting other file kinds
pub fn load_shape(path: impl AsRef<Path>) -> Result<ShapeFile> {
    ShapeFile::load(path)
}

fn has_text_header(text: &str) -> bool {
    text.lines()
        .next()
        .is_some_and(|line| line.trim_start_matches('\u{feff}').trim().starts_with(SHAPE_TEXT_HEADER))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = "SIMISA@@@@@@@@@@JINX0s1t______\r\n\r\nshape (\r\n\tshape_header ( 00000000 00000000 )\r\n\tprim_states ( 0 )\r\n\tpoints ( 0 )\r\n\tuv_points ( 0 )\r\n\tnormals ( 0 )\r\n\tlod_controls ( 0 )\r\n)\r\n";

    #[test]
    fn test_states() {
        let dir = tempfile::tempdir().unwrap();
        let text = dir.path().join("text.s");
        fs::write(&text, Encoding::Utf16Le.encode(MINIMAL)).unwrap();
        let packed = dir.path().join("packed.s");
        fs::write(&packed, b"SIMISA@F\x10\x00\x00\x00@@@@\x78\x9c\x01\x02").unwrap();
        let empty = dir.path().join("empty.s");
        fs::write(&empty, b"").unwrap();

        let file = load_shape(&text).unwrap();
        assert_eq!(file.state(), CompressionState::Decompressed);
        assert_eq!(file.encoding(), Encoding::Utf16Le);
        assert_eq!(file.lines().unwrap()[0], SHAPE_TEXT_HEADER);

        let file = load_shape(&packed).unwrap();
        assert!(file.is_compressed());
        assert!(matches!(file.shape(), Err(Error::AccessDeniedWhileCompressed)));
        assert!(matches!(file.lines(), Err(Error::AccessDeniedWhileCompressed)));

        let file = load_shape(&empty).unwrap();
        assert_eq!(file.state(), CompressionState::Unknown);
        assert!(file.lines().unwrap().is_empty());
    }

    #[test]
    fn test_rejects_other_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("track.sd");
        fs::write(&path, MINIMAL).unwrap();
        assert!(matches!(load_shape(&path), Err(Error::WrongFileKind(_))));
    }

    #[test]
    fn test_save_keeps_encoding_and_untouched_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("text.s");
        fs::write(&path, Encoding::Utf16Le.encode(MINIMAL)).unwrap();

        let file = load_shape(&path).unwrap();
        file.save().unwrap();
        let bytes = fs::read(&path).unwrap();
        assert_eq!(Encoding::Utf16Le.decode(&bytes).unwrap(), MINIMAL);
    }

    #[test]
    fn test_replace_reparses() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("text.s");
        fs::write(&path, MINIMAL).unwrap();

        let mut file = load_shape(&path).unwrap();
        assert_eq!(file.replace_ignorecase("SHAPE_HEADER ( 00000000", "shape_header ( 00000001").unwrap(), 1);
        assert!(file.lines().unwrap()[3].contains("00000001 00000000"));
        assert_eq!(file.replace("no such text", "x").unwrap(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_tool() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("text.s");
        fs::write(&path, MINIMAL).unwrap();

        let mut file = load_shape(&path).unwrap();
        let result = file.compress("false");
        assert!(matches!(result, Err(Error::ExternalTool { status: Some(1), .. })));
        assert_eq!(file.state(), CompressionState::Decompressed);
    }
}

/// Example: Split the first edge of a shape's first trilist and save a copy
///
/// Usage: cargo run --example split_edge -- path/to/shape.s [lod]

use anyhow::{bail, Context, Result};
use std::env;
use trackshape_core::load_shape;

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <shape-file> [lod]", args[0]);
        bail!("No shape file provided");
    }

    let mut file = load_shape(&args[1]).with_context(|| format!("Failed to load {}", args[1]))?;
    let shape = file.shape_mut()?;
    let lod = match args.get(2) {
        Some(lod) => lod.parse().context("LOD must be a number")?,
        None => shape.lod_dlevels().first().copied().context("Shape has no LOD levels")?,
    };

    let Some(mut trilist) = shape.indexed_trilists_in_subobject(lod, 0).into_iter().next() else {
        bail!("Sub-object 0 of LOD {} has no trilists", lod);
    };
    let Some(&[a, b, _]) = trilist.vertex_idxs.get(..3) else {
        bail!("First trilist is empty");
    };
    let v1 = shape.vertex_in_subobject_by_idx(lod, 0, a).context("Missing vertex")?;
    let v2 = shape.vertex_in_subobject_by_idx(lod, 0, b).context("Missing vertex")?;

    println!(
        "Splitting edge {}-{} of {} ({} triangles)",
        a,
        b,
        trilist.prim_state.name,
        trilist.triangle_count()
    );
    let vertex = shape.insert_vertex_between(&mut trilist, &v1, &v2)?;
    println!(
        "New vertex {} at ({:.4}, {:.4}, {:.4}), trilist now has {} triangles",
        vertex.vertex_idx,
        vertex.point.x,
        vertex.point.y,
        vertex.point.z,
        trilist.triangle_count()
    );

    let copy_name = format!("split_{}", file.filename());
    let copy = file.copy(&copy_name, None)?;
    copy.save()?;
    println!("Saved {}", copy.filepath().display());
    Ok(())
}

//! Test asset generators for integration tests
//!
//! Writes small OBJ/MTL files so the tests do not depend on checked-in data.

#![allow(dead_code)]

use std::io::Result;
use std::path::Path;

/// Unit cube: 8 shared vertices, 6 quads with per-face normals, 4 uvs and two
/// materials from `cube.mtl` next to the OBJ
pub fn generate_cube_obj(path: &Path) -> Result<()> {
    let obj = "\
# unit cube
mtllib cube.mtl
o cube
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
v 0 0 1
v 1 0 1
v 1 1 1
v 0 1 1
vt 0 0
vt 1 0
vt 1 1
vt 0 1
vn 0 0 -1
vn 0 0 1
vn 0 -1 0
vn 1 0 0
vn 0 1 0
vn -1 0 0
usemtl stone
f 1/1/1 4/4/1 3/3/1 2/2/1
f 5/1/2 6/2/2 7/3/2 8/4/2
usemtl moss
f 1/1/3 2/2/3 6/3/3 5/4/3
f 2/1/4 3/2/4 7/3/4 6/4/4
f 3/1/5 4/2/5 8/3/5 7/4/5
f 4/1/6 1/2/6 5/3/6 8/4/6
";
    std::fs::write(path, obj)?;

    let mtl = "\
newmtl stone
Kd 0.5 0.5 0.5
Ns 10
illum 2
map_Kd stone.png

newmtl moss
Kd 0.2 0.6 0.2
d 0.9
Pr 0.8
";
    std::fs::write(path.with_file_name("cube.mtl"), mtl)
}

/// Single triangle, positions only
pub fn generate_triangle_obj(path: &Path) -> Result<()> {
    std::fs::write(path, "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n")
}

/// One quad whose corners reference only three distinct vertices
pub fn generate_fake_quad_obj(path: &Path) -> Result<()> {
    std::fs::write(path, "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3 3\n")
}

/// One quad with a corner lifted out of the plane
pub fn generate_bent_quad_obj(path: &Path) -> Result<()> {
    std::fs::write(path, "v 0 0 0\nv 1 0 0\nv 1 1 1\nv 0 1 0\nf 1 2 3 4\n")
}

/// Triangle soup: a grid of quads where every face owns private copies of
/// its corner vertices
pub fn generate_soup_obj(path: &Path, size: u32) -> Result<()> {
    let mut obj = String::new();
    let mut next = 1;
    for y in 0..size {
        for x in 0..size {
            for (dx, dy) in [(0, 0), (1, 0), (1, 1), (0, 1)] {
                obj.push_str(&format!("v {} {} 0\n", x + dx, y + dy));
            }
            obj.push_str(&format!(
                "f {} {} {} {}\n",
                next,
                next + 1,
                next + 2,
                next + 3
            ));
            next += 4;
        }
    }
    std::fs::write(path, obj)
}

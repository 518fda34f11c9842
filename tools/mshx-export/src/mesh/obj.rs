//! OBJ mesh conversion

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::Path;

use mshx_common::{Face, GeometryStore, Normal, TexCoord, Vertex, VertexType};

use super::mtl::{numbers, parse_mtl};
use super::{statement_lines, ConvertedMesh};
use crate::error::ExportError;
use crate::pipeline::{compile_mesh, PipelineConfig};

/// Geometry of an OBJ file plus the material libraries it names
#[derive(Debug, Default)]
pub struct ParsedObj {
    pub store: GeometryStore,
    /// `mtllib` file names in declaration order, unresolved
    pub material_libs: Vec<String>,
}

/// Indices of one face corner, already zero-based
struct Corner {
    v: u32,
    uv: Option<u32>,
    n: Option<u32>,
}

fn malformed(line: usize, keyword: &str) -> ExportError {
    ExportError::Malformed {
        line,
        keyword: keyword.to_string(),
    }
}

/// Parse a 1-based index. Zero is malformed and negative (relative)
/// references are rejected.
fn parse_index(line: usize, attribute: &'static str, token: &str) -> Result<u32, ExportError> {
    let value: i64 = token.parse().map_err(|_| ExportError::InvalidIndex {
        line,
        attribute,
        token: token.to_string(),
    })?;
    if value < 0 {
        return Err(ExportError::RelativeIndex {
            line,
            attribute,
            token: token.to_string(),
        });
    }
    u32::try_from(value - 1).map_err(|_| ExportError::InvalidIndex {
        line,
        attribute,
        token: token.to_string(),
    })
}

/// Parse `v`, `v/vt`, `v/vt/vn` or `v//vn`
fn parse_corner(line: usize, token: &str) -> Result<Corner, ExportError> {
    let parts: Vec<&str> = token.split('/').collect();
    if parts.len() > 3 {
        return Err(ExportError::TooManyComponents {
            line,
            token: token.to_string(),
        });
    }

    let optional = |i: usize, attribute| match parts.get(i) {
        Some(s) if !s.is_empty() => parse_index(line, attribute, s).map(Some),
        _ => Ok(None),
    };

    Ok(Corner {
        v: parse_index(line, "vertex", parts[0])?,
        uv: optional(1, "texture coordinate")?,
        n: optional(2, "normal")?,
    })
}

fn parse_face(line: usize, args: &[&str], material: &str) -> Result<Face, ExportError> {
    if !(3..=4).contains(&args.len()) {
        return Err(ExportError::UnsupportedPolygon {
            line,
            corners: args.len(),
        });
    }

    let corners = args
        .iter()
        .map(|token| parse_corner(line, token))
        .collect::<Result<Vec<_>, _>>()?;

    let layout = |c: &Corner| (c.uv.is_some(), c.n.is_some());
    if corners.iter().any(|c| layout(c) != layout(&corners[0])) {
        return Err(ExportError::MixedCorners { line });
    }

    let v: Vec<u32> = corners.iter().map(|c| c.v).collect();
    let uv: Vec<u32> = corners.iter().filter_map(|c| c.uv).collect();
    let n: Vec<u32> = corners.iter().filter_map(|c| c.n).collect();

    Ok(Face::new(&v)
        .with_uvs(&uv)
        .with_normals(&n)
        .with_material(material))
}

/// Parse OBJ geometry statements into a fresh store.
///
/// Only `v`, `vt`, `vn`, `f`, `usemtl` and `mtllib` are interpreted; other
/// statements are skipped.
pub fn parse_obj<R: BufRead>(reader: R) -> Result<ParsedObj, ExportError> {
    let mut parsed = ParsedObj::default();
    let store = &mut parsed.store;
    let mut material = String::new();

    for statement in statement_lines(reader) {
        let (line_no, line) = statement?;
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some((&keyword, args)) = tokens.split_first() else {
            continue;
        };

        match keyword {
            "v" => {
                let vertex = match numbers(line_no, keyword, args)?.as_slice() {
                    &[x, y, z] => Vertex::new(x, y, z),
                    &[x, y, z, w] => Vertex {
                        w,
                        ..Vertex::new(x, y, z)
                    },
                    &[x, y, z, r, g, b] => {
                        store.vertex_type = VertexType::PositionColor;
                        Vertex::with_color(x, y, z, r, g, b)
                    }
                    _ => return Err(malformed(line_no, keyword)),
                };
                store.vertices.push(vertex);
            }
            "vt" => {
                let uv = match numbers(line_no, keyword, args)?.as_slice() {
                    &[u] => TexCoord::new(u, 0.0),
                    &[u, v] | &[u, v, _] => TexCoord::new(u, v),
                    _ => return Err(malformed(line_no, keyword)),
                };
                store.tex_coords.push(uv);
            }
            "vn" => {
                let normal = match numbers(line_no, keyword, args)?.as_slice() {
                    &[x, y, z] => Normal::new(x, y, z),
                    _ => return Err(malformed(line_no, keyword)),
                };
                store.normals.push(normal);
            }
            "f" => store.faces.push(parse_face(line_no, args, &material)?),
            "usemtl" => {
                material = args
                    .first()
                    .ok_or_else(|| malformed(line_no, keyword))?
                    .to_string();
            }
            "mtllib" => {
                if args.is_empty() {
                    return Err(malformed(line_no, keyword));
                }
                parsed
                    .material_libs
                    .extend(args.iter().map(|s| s.to_string()));
            }
            _ => {}
        }
    }

    Ok(parsed)
}

/// Load an OBJ file and every material library it references.
///
/// `mtllib` paths resolve relative to the OBJ file's directory.
pub fn load_obj(input: &Path) -> Result<GeometryStore> {
    let file = File::open(input).with_context(|| format!("Failed to open OBJ: {:?}", input))?;
    let ParsedObj {
        mut store,
        material_libs,
    } = parse_obj(BufReader::new(file)).with_context(|| format!("Failed to parse {:?}", input))?;

    let base_dir = input.parent().unwrap_or_else(|| Path::new(""));
    for lib in &material_libs {
        let path = base_dir.join(lib);
        let file = File::open(&path)
            .with_context(|| format!("Failed to open material library: {:?}", path))?;
        let added = parse_mtl(BufReader::new(file), &mut store)
            .with_context(|| format!("Failed to parse {:?}", path))?;
        tracing::debug!("Loaded {} materials from {:?}", added, path);
    }

    tracing::info!(
        "Loaded OBJ: {} vertices, {} normals, {} uvs, {} faces, {} materials",
        store.vertices.len(),
        store.normals.len(),
        store.tex_coords.len(),
        store.faces.len(),
        store.materials.len()
    );

    Ok(store)
}

/// Convert an OBJ file to in-memory mesh data
pub fn convert_obj_to_memory(input: &Path, config: &PipelineConfig) -> Result<ConvertedMesh> {
    let mut store = load_obj(input)?;
    let (report, data) =
        compile_mesh(&mut store, config).with_context(|| format!("Failed to compile {:?}", input))?;

    Ok(ConvertedMesh {
        store,
        report,
        data,
    })
}

/// Convert an OBJ file to an MSHX file
pub fn convert_obj(input: &Path, output: &Path, config: &PipelineConfig) -> Result<ConvertedMesh> {
    let mesh = convert_obj_to_memory(input, config)?;

    fs::write(output, &mesh.data)
        .with_context(|| format!("Failed to write output: {:?}", output))?;

    tracing::info!(
        "Converted OBJ mesh: {} vertices, {} faces, {} materials, {} bytes ({})",
        mesh.store.vertices.len(),
        mesh.store.faces.len(),
        mesh.store.materials.len(),
        mesh.data.len(),
        config.byte_order
    );

    Ok(mesh)
}

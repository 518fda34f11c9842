//! MTL material library parsing

use std::io::BufRead;

use mshx_common::{GeometryStore, Material};

use super::statement_lines;
use crate::error::ExportError;

/// Material statements applied to the current `newmtl` block
const PROPERTIES: &[&str] = &[
    "Kd", "Ks", "Ka", "Ke", "Tf", "Ns", "d", "Tr", "Ni", "illum", "Pr", "Pm", "Ps", "Pc", "Pcr",
    "aniso", "anisor", "map_Kd",
];

/// Parse the numeric arguments of a statement
pub(super) fn numbers(line: usize, keyword: &str, args: &[&str]) -> Result<Vec<f32>, ExportError> {
    args.iter()
        .map(|token| {
            token.parse::<f32>().map_err(|_| ExportError::Malformed {
                line,
                keyword: keyword.to_string(),
            })
        })
        .collect()
}

fn scalar(line: usize, keyword: &str, args: &[&str]) -> Result<f32, ExportError> {
    match numbers(line, keyword, args)?.as_slice() {
        [value] => Ok(*value),
        _ => Err(ExportError::Malformed {
            line,
            keyword: keyword.to_string(),
        }),
    }
}

/// One value replicates to all three channels
fn rgb(line: usize, keyword: &str, args: &[&str]) -> Result<[f32; 3], ExportError> {
    match numbers(line, keyword, args)?.as_slice() {
        [v] => Ok([*v; 3]),
        [r, g, b] => Ok([*r, *g, *b]),
        _ => Err(ExportError::Malformed {
            line,
            keyword: keyword.to_string(),
        }),
    }
}

/// Parse an MTL library, appending every `newmtl` block to `store`.
///
/// Returns the number of materials added.
pub fn parse_mtl<R: BufRead>(reader: R, store: &mut GeometryStore) -> Result<usize, ExportError> {
    let mut current: Option<usize> = None;
    let mut added = 0;

    for statement in statement_lines(reader) {
        let (line_no, line) = statement?;
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some((&keyword, args)) = tokens.split_first() else {
            continue;
        };

        if keyword == "newmtl" {
            let name = args.first().ok_or_else(|| ExportError::Malformed {
                line: line_no,
                keyword: keyword.to_string(),
            })?;
            current = Some(store.add_material(Material::new(*name)) as usize);
            added += 1;
            continue;
        }

        if !PROPERTIES.contains(&keyword) {
            tracing::debug!("MTL line {}: ignoring '{}'", line_no, keyword);
            continue;
        }

        let material = match current {
            Some(i) => &mut store.materials[i],
            None => {
                return Err(ExportError::PropertyOutsideMaterial {
                    line: line_no,
                    keyword: keyword.to_string(),
                })
            }
        };

        match keyword {
            "Kd" => material.diffuse = rgb(line_no, keyword, args)?,
            "Ks" => material.specular = rgb(line_no, keyword, args)?,
            "Ka" => material.ambient = rgb(line_no, keyword, args)?,
            "Ke" => material.emissive = rgb(line_no, keyword, args)?,
            "Tf" => {
                if let Some(&space) = args.first().filter(|s| matches!(**s, "xyz" | "spectral")) {
                    return Err(ExportError::UnsupportedColorSpace {
                        line: line_no,
                        space: space.to_string(),
                    });
                }
                material.transmissive = rgb(line_no, keyword, args)?;
            }
            "Ns" => material.power = scalar(line_no, keyword, args)?,
            "d" => material.transparency = 1.0 - scalar(line_no, keyword, args)?,
            "Tr" => material.transparency = scalar(line_no, keyword, args)?,
            "Ni" => material.refractivity = scalar(line_no, keyword, args)?,
            "illum" => {
                material.illum = match args {
                    [value] => value.parse().map_err(|_| ExportError::Malformed {
                        line: line_no,
                        keyword: keyword.to_string(),
                    })?,
                    _ => {
                        return Err(ExportError::Malformed {
                            line: line_no,
                            keyword: keyword.to_string(),
                        })
                    }
                }
            }
            "Pr" => material.roughness = scalar(line_no, keyword, args)?,
            "Pm" => material.metallic = scalar(line_no, keyword, args)?,
            "Ps" => material.sheen = scalar(line_no, keyword, args)?,
            "Pc" => material.clearcoat_thickness = scalar(line_no, keyword, args)?,
            "Pcr" => material.clearcoat_roughness = scalar(line_no, keyword, args)?,
            "aniso" => material.aniso = scalar(line_no, keyword, args)?,
            "anisor" => material.aniso_rotation = scalar(line_no, keyword, args)?,
            // Options such as `-s 1 1 1` precede the file name
            "map_Kd" => {
                let file = args.last().ok_or_else(|| ExportError::Malformed {
                    line: line_no,
                    keyword: keyword.to_string(),
                })?;
                material.texture = Some(file.to_string());
            }
            _ => {}
        }
    }

    Ok(added)
}

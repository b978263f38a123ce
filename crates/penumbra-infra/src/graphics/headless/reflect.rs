// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Minimal GLSL front end of the headless device.
//!
//! Sources follow the single-file convention of the built-in programs: the
//! vertex stage sits between `#ifdef VERTEX` and its `#endif`. Only the vertex
//! inputs are reflected; nothing is type-checked.

use penumbra_core::renderer::{ShaderInputAttribute, ShaderInputLayout};

const VERTEX_GUARD: &str = "#ifdef VERTEX";

/// Checks a source the way a driver would reject it outright.
///
/// An empty source and any `#error` directive fail, the latter with its message.
pub(crate) fn check_source(source: &str) -> Result<(), String> {
    if source.trim().is_empty() {
        return Err("empty shader source".to_string());
    }
    for (number, line) in source.lines().enumerate() {
        if let Some(message) = line.trim_start().strip_prefix("#error") {
            return Err(format!("{}: #error {}", number + 1, message.trim()));
        }
    }
    Ok(())
}

/// The text of the vertex stage, or the whole source without a guard.
fn vertex_stage(source: &str) -> &str {
    let Some(start) = source.find(VERTEX_GUARD) else {
        return source;
    };
    let body = &source[start + VERTEX_GUARD.len()..];
    match body.find("#endif") {
        Some(end) => &body[..end],
        None => body,
    }
}

fn component_count(glsl_type: &str) -> Option<u8> {
    match glsl_type {
        "float" | "int" | "uint" => Some(1),
        "vec2" | "ivec2" | "uvec2" => Some(2),
        "vec3" | "ivec3" | "uvec3" => Some(3),
        "vec4" | "ivec4" | "uvec4" => Some(4),
        _ => None,
    }
}

/// Parses `layout(location = N) in TYPE name;`.
fn parse_input(line: &str) -> Option<ShaderInputAttribute> {
    let rest = line.trim().strip_prefix("layout")?.trim_start().strip_prefix('(')?;
    let (qualifiers, declaration) = rest.split_once(')')?;
    let location = qualifiers.split(',').find_map(|q| {
        let (key, value) = q.split_once('=')?;
        (key.trim() == "location").then(|| value.trim().parse::<u32>().ok())?
    })?;

    let mut tokens = declaration.split_whitespace();
    if tokens.next()? != "in" {
        return None;
    }
    let component_count = component_count(tokens.next()?)?;
    Some(ShaderInputAttribute {
        location,
        component_count,
    })
}

/// Reflects the vertex inputs, sorted by location.
pub(crate) fn reflect_vertex_inputs(source: &str) -> Result<ShaderInputLayout, String> {
    let mut attributes: Vec<ShaderInputAttribute> =
        vertex_stage(source).lines().filter_map(parse_input).collect();
    attributes.sort_by_key(|a| a.location);
    if let Some(pair) = attributes.windows(2).find(|w| w[0].location == w[1].location) {
        return Err(format!("vertex input location {} declared twice", pair[0].location));
    }
    Ok(ShaderInputLayout { attributes })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = r#"
#version 450
#ifdef VERTEX
layout(location = 2) in vec2 aTexCoord;
layout(location = 0) in vec3 aPosition;
layout(location = 1) out vec2 vTexCoord;
layout(std140, binding = 1) uniform LocalParams { mat4 uWorld; };
void main() {}
#endif
#ifdef FRAGMENT
layout(location = 0) in vec2 vTexCoord;
layout(location = 0) out vec4 oColor;
void main() {}
#endif
"#;

    #[test]
    fn test_reflects_vertex_stage_only() {
        let layout = reflect_vertex_inputs(SOURCE).unwrap();
        assert_eq!(
            layout.attributes,
            vec![
                ShaderInputAttribute {
                    location: 0,
                    component_count: 3
                },
                ShaderInputAttribute {
                    location: 2,
                    component_count: 2
                },
            ]
        );
    }

    #[test]
    fn test_unguarded_source_is_scanned_whole() {
        let layout = reflect_vertex_inputs("layout(location=4) in float aWeight;").unwrap();
        assert_eq!(layout.attributes.len(), 1);
        assert_eq!(layout.attributes[0].location, 4);
        assert_eq!(layout.attributes[0].component_count, 1);
    }

    #[test]
    fn test_duplicate_location_is_rejected() {
        let source = "layout(location = 0) in vec3 a;\nlayout(location = 0) in vec2 b;";
        assert!(reflect_vertex_inputs(source).is_err());
    }

    #[test]
    fn test_check_source() {
        assert!(check_source("   \n").is_err());
        let err = check_source("#version 450\n#error broken on purpose\n").unwrap_err();
        assert!(err.contains("broken on purpose"));
        assert!(check_source(SOURCE).is_ok());
    }
}

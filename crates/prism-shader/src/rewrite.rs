//! Rewrite helpers shared by more than one backend emitter.

use prism_glsl::buffer::is_ident_char;
use prism_glsl::SourceBuffer;

/// Replaces the `void main(...)` header with `replacement`. Returns
/// false when no `main` function exists.
pub(crate) fn replace_main_header(buf: &mut SourceBuffer, replacement: &str) -> bool {
    let mut pos = 0;
    while let Some(at) = buf.find_from("void", pos) {
        // `at + 9` skips past the shortest possible header prefix
        // ("void main"); a '(' any earlier belongs to a shorter
        // function name, which the name check below rejects anyway.
        let Some(lparen) = buf.find_from("(", at + 9) else {
            return false;
        };
        let name: String = buf.as_str()[at + 5..lparen]
            .chars()
            .filter(|&c| c > ' ')
            .collect();
        if name != "main" {
            pos = at + 4;
            continue;
        }
        let Some(rparen) = buf.find_from(")", lparen) else {
            return false;
        };
        buf.replace_range(at..rparen + 1, replacement);
        return true;
    }
    false
}

/// `vecN` -> `floatN`, `matN` -> `floatNxN`. The spellings are shared
/// by HLSL and Metal.
pub(crate) fn replace_vector_types(buf: &mut SourceBuffer) {
    for (from, to) in [
        ("vec2", "float2"),
        ("vec3", "float3"),
        ("vec4", "float4"),
        ("mat2", "float2x2"),
        ("mat3", "float3x3"),
        ("mat4", "float4x4"),
    ] {
        buf.replace_ident(from, to);
    }
}

/// Rewrites single-argument `vecN(expr)` constructor calls to
/// `{func}N(expr)`. HLSL and Metal constructor overloads are stricter
/// than GLSL's splatting `vecN(scalar)`, so those call sites go
/// through dedicated promote functions instead; calls with two or
/// more arguments are valid as-is and left untouched. Returns whether
/// anything was rewritten (the caller only emits the promote
/// functions when needed).
pub(crate) fn replace_vec_from_float(buf: &mut SourceBuffer, func: &str) -> bool {
    let mut replaced = false;
    let mut pos = 0;
    while let Some(at) = buf.find_from("vec", pos) {
        enum Action {
            Skip,
            Stop,
            Replace { dim: char, close: usize },
        }
        let action = {
            let b = buf.as_bytes();
            if at > 0 && is_ident_char(b[at - 1]) {
                Action::Skip
            } else if at + 4 > b.len() {
                Action::Stop
            } else if !matches!(b[at + 3], b'2' | b'3' | b'4') {
                Action::Skip
            } else {
                let mut p = at + 4;
                while p < b.len() && b[p] <= b' ' {
                    p += 1;
                }
                if p >= b.len() {
                    Action::Stop
                } else if b[p] != b'(' {
                    Action::Skip
                } else {
                    let mut depth = 0i32;
                    let mut q = p;
                    let mut found = None;
                    loop {
                        q += 1;
                        if q >= b.len() {
                            break;
                        }
                        match b[q] {
                            b'(' => depth += 1,
                            b')' => {
                                depth -= 1;
                                if depth < 0 {
                                    found = Some((q, false));
                                    break;
                                }
                            }
                            b',' if depth == 0 => {
                                found = Some((q, true));
                                break;
                            }
                            _ => {}
                        }
                    }
                    match found {
                        // Unterminated call: leave the tail alone.
                        None => Action::Stop,
                        Some((_, true)) => Action::Skip,
                        Some((close, false)) => Action::Replace {
                            dim: b[at + 3] as char,
                            close,
                        },
                    }
                }
            }
        };
        match action {
            Action::Stop => break,
            Action::Skip => pos = at + 3,
            Action::Replace { dim, close } => {
                // The matching '(' sits right after any whitespace
                // following `vecN`; re-derive it for the slice.
                let open = buf.as_str()[at + 4..]
                    .find('(')
                    .map(|o| at + 4 + o)
                    .unwrap_or(at + 4);
                let inner = buf.as_str()[open + 1..close].to_owned();
                buf.replace_range(at..close + 1, &format!("{func}{dim}({inner})"));
                replaced = true;
                pos = at + 3;
            }
        }
    }
    replaced
}

/// Appends `texture2D`/`textureCube`/`texture2DProj` macro expansions
/// for targets whose samplers are texture + sampler-state pairs.
/// `sample_method` is `Sample` for HLSL, `sample` for Metal.
pub(crate) fn append_texture_macros(
    buf: &SourceBuffer,
    prologue: &mut String,
    prefix: &str,
    sample_method: &str,
) {
    if buf.contains_ident("texture2D") {
        prologue.push_str(&format!(
            "#define texture2D(a,b) a.{sample_method}(a##{prefix}st,(b))\n"
        ));
    }
    if buf.contains_ident("textureCube") {
        prologue.push_str(&format!(
            "#define textureCube(a,b) a.{sample_method}(a##{prefix}st,(b))\n"
        ));
    }
    if buf.contains_ident("texture2DProj") {
        prologue.push_str(&format!(
            "float2 {prefix}tc_proj(float3 tc){{return tc.xy/tc.z;}}\n"
        ));
        prologue.push_str(&format!(
            "float2 {prefix}tc_proj(float4 tc){{return tc.xy/tc.w;}}\n"
        ));
        prologue.push_str(&format!(
            "#define texture2DProj(a,b) a.{sample_method}(a##{prefix}st,{prefix}tc_proj(b))\n"
        ));
    }
}

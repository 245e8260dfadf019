//! Declaration parsing: `uniform`/`varying`/`out` statements and the
//! predefined `gl_*` uniform/attribute set.

use thiserror::Error;

use crate::buffer::{is_ident_char, SourceBuffer};
use crate::builtins::{self, MULTI_TEXCOORD_PREFIX};
use crate::var::{VarTable, VarType, Variable};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeclError {
    #[error("unclosed ; on variable declaration")]
    UnclosedDeclaration,
    #[error("unknown type `{0}` in declaration")]
    UnknownType(String),
    #[error("bad array size {0} in declaration of `{1}`")]
    BadArraySize(i64, String),
    #[error("unexpected end of source in declaration")]
    UnexpectedEnd,
}

/// Scans every whole-token occurrence of `keyword` and parses the
/// declaration that follows: type token, name token, optional `[n]`
/// array suffix, terminating `;`.
///
/// With `remove = true` each parsed declaration statement (keyword
/// through `;`) is deleted from the buffer; with `remove = false` the
/// buffer is left untouched and the scan resumes past the statement,
/// which is what the introspection path uses.
pub fn parse_declarations(
    buf: &mut SourceBuffer,
    keyword: &str,
    remove: bool,
) -> Result<Vec<Variable>, DeclError> {
    let mut out = Vec::new();
    let mut pos = 0;
    while let Some(at) = buf.find_ident(keyword, pos) {
        let (var, last) = parse_one(buf.as_bytes(), at + keyword.len())?;
        out.push(var);
        if remove {
            buf.remove_range(at..last + 1);
            pos = at;
        } else {
            pos = last + 1;
        }
    }
    Ok(out)
}

/// Parses one declaration starting right after its keyword. Returns
/// the variable and the offset of the terminating `;`.
fn parse_one(b: &[u8], mut i: usize) -> Result<(Variable, usize), DeclError> {
    while i < b.len() && b[i] <= b' ' {
        i += 1;
    }
    if i >= b.len() {
        return Err(DeclError::UnexpectedEnd);
    }

    let type_from = i;
    while i < b.len() && b[i] > b' ' {
        i += 1;
    }
    if i >= b.len() {
        return Err(DeclError::UnexpectedEnd);
    }
    let type_token = String::from_utf8_lossy(&b[type_from..i]).into_owned();

    while i < b.len() && b[i] <= b' ' {
        i += 1;
    }
    if i >= b.len() {
        return Err(DeclError::UnexpectedEnd);
    }

    let name_from = i;
    while i < b.len() && b[i] > b' ' && b[i] != b';' && b[i] != b'[' {
        i += 1;
    }
    if i >= b.len() {
        return Err(DeclError::UnexpectedEnd);
    }
    let name = String::from_utf8_lossy(&b[name_from..i]).into_owned();

    let mut last = i;
    while b[last] != b';' {
        last += 1;
        if last >= b.len() {
            return Err(DeclError::UnclosedDeclaration);
        }
    }

    let mut array_size = 1i64;
    if let Some(bracket) = b[i..last].iter().position(|&c| c == b'[') {
        array_size = leading_int(&b[i + bracket + 1..]);
        if array_size <= 0 {
            return Err(DeclError::BadArraySize(array_size, name));
        }
    }

    let ty = VarType::parse(&type_token).ok_or(DeclError::UnknownType(type_token))?;
    Ok((Variable::new(name, ty, array_size as u32), last))
}

/// `atoi`-style integer scan: leading whitespace, optional sign,
/// decimal digits; anything else yields 0.
fn leading_int(b: &[u8]) -> i64 {
    let mut i = 0;
    while i < b.len() && b[i].is_ascii_whitespace() {
        i += 1;
    }
    let mut sign = 1i64;
    if i < b.len() && (b[i] == b'-' || b[i] == b'+') {
        if b[i] == b'-' {
            sign = -1;
        }
        i += 1;
    }
    let mut value = 0i64;
    let mut any = false;
    while i < b.len() && b[i].is_ascii_digit() {
        value = value * 10 + i64::from(b[i] - b'0');
        any = true;
        i += 1;
        if value > i64::from(u32::MAX) {
            break;
        }
    }
    if any {
        sign * value
    } else {
        0
    }
}

/// Synthesizes table entries for the predefined matrix uniforms that
/// the shader actually references. Entry names get `prefix` in place
/// of `gl_` so they cannot collide with user identifiers; with
/// `rename = true` every occurrence in the buffer is rewritten to the
/// prefixed name as well.
pub fn collect_predefined_matrices(
    buf: &mut SourceBuffer,
    prefix: &str,
    rename: bool,
    table: &mut VarTable,
) {
    for builtin in builtins::matrix_uniforms() {
        let to = format!("{prefix}{}", builtins::strip_gl(builtin.name));
        let referenced = if rename {
            buf.replace_ident(builtin.name, &to)
        } else {
            buf.contains_ident(builtin.name)
        };
        if referenced {
            let ty = builtin.ty.unwrap_or(VarType::Mat4);
            table.push_unique(Variable::new(to, ty, 1));
        }
    }
}

/// Synthesizes table entries for the predefined attributes
/// (`gl_Vertex`, `gl_Normal`, `gl_Color`, `gl_MultiTexCoordN`).
///
/// Table entries are named `table_prefix` + name-without-`gl_`. With
/// `code_prefix = Some(p)` occurrences in the buffer are rewritten to
/// `p` + name-without-`gl_` (backends pass either the mangling prefix
/// or an input-struct member path like `"in."`); `None` records the
/// attributes without touching the buffer.
pub fn collect_predefined_attributes(
    buf: &mut SourceBuffer,
    table_prefix: &str,
    code_prefix: Option<&str>,
    table: &mut VarTable,
) {
    for builtin in builtins::attributes() {
        let info = format!("{table_prefix}{}", builtins::strip_gl(builtin.name));
        let referenced = match code_prefix {
            Some(p) => {
                let to = format!("{p}{}", builtins::strip_gl(builtin.name));
                buf.replace_ident(builtin.name, &to)
            }
            None => buf.find_from(builtin.name, 0).is_some(),
        };
        if referenced {
            let ty = builtin.ty.unwrap_or(VarType::Vec4);
            table.push_unique(Variable::with_slot(info, ty, 0));
        }
    }

    let mut pos = 0;
    while let Some(at) = buf.find_from(MULTI_TEXCOORD_PREFIX, pos) {
        if at > 0 && is_ident_char(buf.as_bytes()[at - 1]) {
            pos = at + MULTI_TEXCOORD_PREFIX.len();
            continue;
        }
        let digits_at = at + MULTI_TEXCOORD_PREFIX.len();
        let idx = leading_digits(&buf.as_bytes()[digits_at..]);
        if let Some(p) = code_prefix {
            // Only the `gl_` prefix is replaced; the digits stay.
            buf.replace_range(at..at + 3, p);
            pos = digits_at + p.len() - 3;
        } else {
            pos = digits_at;
        }
        table.push_unique(Variable::with_slot(
            format!("{table_prefix}MultiTexCoord{idx}"),
            VarType::Vec4,
            idx,
        ));
    }
}

fn leading_digits(b: &[u8]) -> u32 {
    let mut value = 0u32;
    for &c in b {
        if !c.is_ascii_digit() {
            break;
        }
        value = value.saturating_mul(10).saturating_add(u32::from(c - b'0'));
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_and_removes_uniform_declarations() {
        let mut buf = SourceBuffer::new(
            "uniform vec4 color;\nuniform sampler2D diffuse;\nvoid main(){}\n",
        );
        let vars = parse_declarations(&mut buf, "uniform", true).unwrap();
        assert_eq!(
            vars,
            vec![
                Variable::new("color", VarType::Vec4, 1),
                Variable::new("diffuse", VarType::Sampler2d, 1),
            ]
        );
        assert_eq!(buf.as_str(), "\n\nvoid main(){}\n");
    }

    #[test]
    fn introspection_leaves_buffer_untouched() {
        let src = "uniform mat4 bones[32]; uniform float t; void main(){}";
        let mut destructive = SourceBuffer::new(src);
        let removed = parse_declarations(&mut destructive, "uniform", true).unwrap();

        let mut readonly = SourceBuffer::new(src);
        let kept = parse_declarations(&mut readonly, "uniform", false).unwrap();

        assert_eq!(removed, kept);
        assert_eq!(readonly.as_str(), src);
        assert_eq!(kept[0], Variable::new("bones", VarType::Mat4, 32));
    }

    #[test]
    fn keyword_matching_is_whole_token() {
        // `out` must not match inside user identifiers.
        let mut buf = SourceBuffer::new("float fallout; out vec3 normal_out; void main(){}");
        let vars = parse_declarations(&mut buf, "out", false).unwrap();
        assert_eq!(vars, vec![Variable::new("normal_out", VarType::Vec3, 1)]);
    }

    #[test]
    fn unknown_type_is_an_error() {
        let mut buf = SourceBuffer::new("uniform fooType x;");
        let err = parse_declarations(&mut buf, "uniform", true).unwrap_err();
        assert_eq!(err, DeclError::UnknownType("fooType".to_owned()));
    }

    #[test]
    fn missing_semicolon_is_an_error() {
        let mut buf = SourceBuffer::new("varying vec2 uv");
        let err = parse_declarations(&mut buf, "varying", true).unwrap_err();
        assert_eq!(err, DeclError::UnexpectedEnd);
    }

    #[test]
    fn non_positive_array_size_is_an_error() {
        let mut buf = SourceBuffer::new("uniform vec4 palette[0];");
        let err = parse_declarations(&mut buf, "uniform", true).unwrap_err();
        assert_eq!(err, DeclError::BadArraySize(0, "palette".to_owned()));
    }

    #[test]
    fn predefined_matrices_are_renamed_and_recorded() {
        let mut buf =
            SourceBuffer::new("void main(){gl_Position=gl_ModelViewProjectionMatrix*gl_Vertex;}");
        let mut table = VarTable::new();
        collect_predefined_matrices(&mut buf, "_xc_", true, &mut table);
        assert_eq!(
            table.as_slice(),
            &[Variable::new("_xc_ModelViewProjectionMatrix", VarType::Mat4, 1)]
        );
        assert!(buf.as_str().contains("_xc_ModelViewProjectionMatrix"));
        assert!(!buf.as_str().contains("gl_ModelViewProjectionMatrix"));
    }

    #[test]
    fn multi_texcoord_keeps_its_index() {
        let mut buf = SourceBuffer::new("void main(){vec4 tc=gl_MultiTexCoord2;}");
        let mut table = VarTable::new();
        collect_predefined_attributes(&mut buf, "_xc_", Some("_xc_"), &mut table);
        assert_eq!(
            table.as_slice(),
            &[Variable::with_slot("_xc_MultiTexCoord2", VarType::Vec4, 2)]
        );
        assert!(buf.as_str().contains("_xc_MultiTexCoord2"));
    }
}

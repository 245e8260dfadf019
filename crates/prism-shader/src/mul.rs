//! Matrix-multiply disambiguation.
//!
//! The source dialect overloads `*` for scalar, component-wise vector
//! and matrix multiplication; HLSL needs genuine matrix products
//! spelled `mul(a,b)`. This is a local, single-pass lexical heuristic
//! over operand names, not a type checker: it knows about mat-typed
//! uniforms, varyings and locals, and anything it cannot prove to be
//! a matrix (function return values, swizzled subexpressions) is
//! conservatively left as `*`.

use std::collections::HashMap;

use tracing::debug;

use prism_glsl::buffer::is_ident_char;
use prism_glsl::{SourceBuffer, VarTable};

use crate::TranslateError;

/// Byte range in which a matrix name is considered live. Globals span
/// the whole buffer; locals run from their declaration's `;` to the
/// end of the buffer, an approximation that ignores block scope (the
/// engine's shaders never reuse a matrix local's name, so the loose
/// range is kept for parity with the original behavior).
type Scope = (usize, usize);

fn matrix_scopes(
    buf: &SourceBuffer,
    uniforms: &VarTable,
    varyings: &VarTable,
) -> HashMap<String, Scope> {
    let mut scopes: HashMap<String, Scope> = HashMap::new();
    for v in varyings.iter().chain(uniforms.iter()) {
        if v.ty.is_matrix() {
            scopes.insert(v.name.clone(), (0, usize::MAX));
        }
    }

    // Function-local `matN name [= ...];` declarations, found
    // lexically; uniform/varying declarations are already gone from
    // the buffer by the time this runs.
    let mut pos = 0;
    while let Some(at) = buf.find_from("mat", pos) {
        let b = buf.as_bytes();
        if at > 0 && is_ident_char(b[at - 1]) {
            pos = at + 3;
            continue;
        }
        if at + 5 >= b.len() {
            break;
        }
        if !matches!(b[at + 3], b'2' | b'3' | b'4') {
            pos = at + 3;
            continue;
        }
        if is_ident_char(b[at + 4]) {
            pos = at + 4;
            continue;
        }
        let Some(end) = buf.find_from(";", at + 4) else {
            break;
        };
        let mut name = &buf.as_str()[at + 4..end];
        if let Some(eq) = name.find('=') {
            name = &name[..eq];
        }
        scopes.insert(name.trim().to_owned(), (end, usize::MAX));
        pos = at + 4;
    }

    scopes
}

/// True for operands with no identifier characters at all: numeric
/// literals, and by extension empty operands.
fn is_numeric_only(operand: &str) -> bool {
    !operand
        .chars()
        .any(|c| c.is_ascii_alphabetic() || c == '_')
}

/// Rewrites every `*` whose left or right operand names a live
/// mat-typed variable into `{func}(left,right)`. Returns whether any
/// rewrite happened.
pub(crate) fn replace_matrix_mul(
    buf: &mut SourceBuffer,
    uniforms: &VarTable,
    varyings: &VarTable,
    func: &str,
) -> Result<bool, TranslateError> {
    let scopes = matrix_scopes(buf, uniforms, varyings);

    let mut rewrites = 0usize;
    let mut pos = 0;
    while let Some(star) = buf.find_from("*", pos) {
        let (Some(left), Some(right)) = (buf.operand_start(star), buf.operand_end(star)) else {
            return Err(TranslateError::MultiplyOperand);
        };
        let left_var = buf.as_str()[left..star].trim().to_owned();
        let right_var = buf.as_str()[star + 1..right].trim().to_owned();

        // `*=` has an empty right operand.
        if right_var.is_empty() {
            pos = star + 1;
            continue;
        }

        // A literal on either side makes this a scalar multiply.
        if is_numeric_only(&left_var) || is_numeric_only(&right_var) {
            pos = star + 1;
            continue;
        }

        let live = |name: &str| {
            scopes
                .get(name)
                .is_some_and(|&(from, to)| from <= star && star <= to)
        };
        if !live(&left_var) && !live(&right_var) {
            pos = star + 1;
            continue;
        }

        buf.replace_range(left..right, &format!("{func}({left_var},{right_var})"));
        rewrites += 1;
        // Rescan from the start of the rewritten call; `*` inside a
        // parenthesized operand still needs classification.
        pos = left;
    }

    if rewrites > 0 {
        debug!(rewrites, func, "rewrote matrix multiplies to explicit calls");
    }
    Ok(rewrites > 0)
}

//! GLSL ES 2.0 backend.
//!
//! The dialect is already close to the source one; the work is
//! declaring the predefined uniforms/attributes explicitly, pulling
//! in the extensions for instancing and external samplers, and
//! pinning a default float precision. Optionally, `pow`/`sqrt` calls
//! are routed through synthesized per-component overloads for drivers
//! that reject the vector forms.

use prism_glsl::{decl, SourceBuffer, VarType};

use crate::{Conversion, TranslateError};

pub(crate) fn convert(cv: &mut Conversion) -> Result<(), TranslateError> {
    let prefix = cv.prefix().to_owned();

    if cv.opts.es2_per_component_builtins {
        expand_per_component_builtins(&mut cv.buf, &prefix);
    }

    decl::collect_predefined_matrices(&mut cv.buf, &prefix, true, &mut cv.uniforms);
    decl::collect_predefined_attributes(&mut cv.buf, &prefix, Some(&prefix), &mut cv.attributes);

    let mut prologue = String::from("#define OPENGL_ES2 1\n");

    if cv.buf.replace_ident("gl_InstanceID", "gl_InstanceIDEXT") {
        prologue.push_str("#extension GL_EXT_draw_instanced : enable\n");
    }
    if cv.buf.replace_ident("samplerExternal", "samplerExternalOES") {
        prologue.push_str("#extension GL_OES_EGL_image_external : require\n");
    }

    for v in &cv.uniforms {
        prologue.push_str(&format!("uniform mat4 {};\n", v.name));
    }
    for a in &cv.attributes {
        let ty = if a.ty == VarType::Vec3 { "vec3" } else { "vec4" };
        prologue.push_str(&format!("attribute {ty} {};\n", a.name));
    }

    cv.parse_uniforms(false)?;

    prologue.push_str(&format!(
        "precision {} float;\n",
        cv.opts.es2_precision.glsl_name()
    ));
    cv.buf.prepend(&prologue);
    Ok(())
}

/// Wraps `pow` and `sqrt` in overloads that apply the scalar built-in
/// per component. The overload bodies go in front of the shader so
/// every later call site resolves to them.
fn expand_per_component_builtins(buf: &mut SourceBuffer, prefix: &str) {
    const FUNCTIONS: [(&str, usize); 2] = [("pow", 2), ("sqrt", 1)];
    const TYPES: [&str; 4] = ["float", "vec2", "vec3", "vec4"];
    const COMPONENTS: [&str; 4] = [".x", ".y", ".z", ".w"];

    let mut overloads = String::new();
    for (f, arg_count) in FUNCTIONS {
        if !buf.replace_ident(f, &format!("{prefix}{f}")) {
            continue;
        }
        for (dim, ty) in TYPES.iter().enumerate() {
            overloads.push_str(&format!("{ty} {prefix}{f}("));
            for arg in 0..arg_count {
                if arg > 0 {
                    overloads.push(',');
                }
                overloads.push_str(&format!("{ty} a{arg}"));
            }
            let ctor = if dim == 0 { "" } else { ty };
            overloads.push_str(&format!("){{return {ctor}("));
            for comp in 0..=dim {
                if comp > 0 {
                    overloads.push(',');
                }
                overloads.push_str(&format!("{f}("));
                for arg in 0..arg_count {
                    if arg > 0 {
                        overloads.push(',');
                    }
                    let swizzle = if dim == 0 { "" } else { COMPONENTS[comp] };
                    overloads.push_str(&format!("a{arg}{swizzle}"));
                }
                overloads.push(')');
            }
            overloads.push_str(");}\n");
        }
    }
    buf.prepend(&overloads);
}

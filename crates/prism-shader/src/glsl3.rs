//! GLSL 3.3 core backend, upgraded to 4.0 when the shader uses
//! GL4-only texture built-ins.

use prism_glsl::{decl, VarType};

use crate::{Conversion, TranslateError};

pub(crate) fn convert(cv: &mut Conversion) -> Result<(), TranslateError> {
    let prefix = cv.prefix().to_owned();

    decl::collect_predefined_matrices(&mut cv.buf, &prefix, true, &mut cv.uniforms);
    decl::collect_predefined_attributes(&mut cv.buf, &prefix, Some(&prefix), &mut cv.attributes);

    let require_gl4 =
        cv.buf.contains_ident("textureQueryLod") || cv.buf.find_from("textureGather", 0).is_some();
    let mut prologue = if require_gl4 {
        String::from("#version 400\n#define OPENGL3 1\n#define OPENGL4 1\n")
    } else {
        String::from("#version 330\n#define OPENGL3 1\n")
    };

    for v in &cv.uniforms {
        prologue.push_str(&format!("uniform mat4 {};\n", v.name));
    }
    cv.parse_uniforms(false)?;

    for a in &cv.attributes {
        let ty = if a.ty == VarType::Vec3 { "vec3" } else { "vec4" };
        prologue.push_str(&format!("in {ty} {};\n", a.name));
    }

    cv.buf.replace_ident("texture2D", "texture");
    cv.buf.replace_ident("texture2DProj", "textureProj");
    cv.buf.replace_ident("textureCube", "texture");

    let frag_out = format!("{prefix}FragColor");
    if cv.buf.replace_ident("gl_FragColor", &frag_out) {
        prologue.push_str(&format!("layout(location=0) out vec4 {frag_out};\n"));
        cv.buf.replace_ident("varying", "in");
    } else {
        cv.buf.replace_ident("varying", "out");
    }

    cv.buf.prepend(&prologue);
    Ok(())
}

//! Legacy desktop GLSL backend: the source dialect already is legacy
//! GLSL, so the only rewriting is pulling in the extensions behind
//! `gl_InstanceID`/`gl_VertexID`. Variable tables are still reported
//! so the binding layer treats every target uniformly.

use prism_glsl::decl;

use crate::{Conversion, TranslateError};

pub(crate) fn convert(cv: &mut Conversion) -> Result<(), TranslateError> {
    if cv.buf.replace_ident("gl_InstanceID", "gl_InstanceIDARB") {
        cv.buf.prepend("#extension GL_ARB_draw_instanced:enable\n");
    }
    if cv.buf.contains_ident("gl_VertexID") {
        cv.buf.prepend("#extension GL_EXT_gpu_shader4:require\n");
    }

    let prefix = cv.prefix().to_owned();
    decl::collect_predefined_matrices(&mut cv.buf, &prefix, false, &mut cv.uniforms);
    cv.parse_uniforms(false)?;
    decl::collect_predefined_attributes(&mut cv.buf, &prefix, None, &mut cv.attributes);
    cv.parse_varyings(false)?;
    Ok(())
}

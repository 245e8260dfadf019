use pretty_assertions::assert_eq;
use prism_shader::{translate, Options, Precision, Stage, Target, VarType};

#[test]
fn glsl3_vertex_declares_predefined_inputs() {
    let t = translate(
        "void main(){gl_Position=gl_ModelViewProjectionMatrix*gl_Vertex;}",
        Target::Glsl3,
        &Options::default(),
    )
    .unwrap();
    assert!(t.source.starts_with("#version 330\n#define OPENGL3 1\n"));
    assert!(t
        .source
        .contains("uniform mat4 _xc_ModelViewProjectionMatrix;\n"));
    assert!(t.source.contains("in vec4 _xc_Vertex;\n"));
    assert!(t
        .source
        .contains("gl_Position=_xc_ModelViewProjectionMatrix*_xc_Vertex;"));
}

#[test]
fn glsl3_fragment_declares_color_output() {
    let t = translate(
        "varying vec2 uv;\nuniform sampler2D diffuse;\nvoid main(){gl_FragColor=texture2D(diffuse,uv);}",
        Target::Glsl3,
        &Options::default(),
    )
    .unwrap();
    assert_eq!(t.stage, Stage::Fragment);
    assert!(t
        .source
        .contains("layout(location=0) out vec4 _xc_FragColor;\n"));
    assert!(t.source.contains("in vec2 uv;"));
    assert!(t.source.contains("_xc_FragColor=texture(diffuse,uv);"));
}

#[test]
fn glsl3_vertex_varyings_become_outs() {
    let t = translate(
        "varying vec3 vn;\nvoid main(){vn=gl_Normal;gl_Position=gl_Vertex;}",
        Target::Glsl3,
        &Options::default(),
    )
    .unwrap();
    assert!(t.source.contains("out vec3 vn;"));
    assert!(t.source.contains("in vec3 _xc_Normal;\n"));
}

#[test]
fn gl4_builtins_raise_the_version() {
    let t = translate(
        "uniform sampler2D s;\nvoid main(){gl_FragColor=textureGather(s,vec2(0.5,0.5));}",
        Target::Glsl3,
        &Options::default(),
    )
    .unwrap();
    assert!(t
        .source
        .starts_with("#version 400\n#define OPENGL3 1\n#define OPENGL4 1\n"));
}

#[test]
fn es2_declares_precision_and_predefined_vars() {
    let t = translate(
        "void main(){gl_Position=gl_ModelViewProjectionMatrix*gl_Vertex;}",
        Target::GlslEs2,
        &Options::default(),
    )
    .unwrap();
    assert!(t.source.starts_with("#define OPENGL_ES2 1\n"));
    assert!(t
        .source
        .contains("uniform mat4 _xc_ModelViewProjectionMatrix;\n"));
    assert!(t.source.contains("attribute vec4 _xc_Vertex;\n"));
    assert!(t.source.contains("precision mediump float;\n"));
}

#[test]
fn es2_precision_follows_options() {
    let opts = Options {
        es2_precision: Precision::Highp,
        ..Options::default()
    };
    let t = translate("void main(){gl_Position=gl_Vertex;}", Target::GlslEs2, &opts).unwrap();
    assert!(t.source.contains("precision highp float;\n"));
}

#[test]
fn es2_instancing_pulls_in_the_extension() {
    let t = translate(
        "void main(){gl_Position=gl_Vertex+vec4(float(gl_InstanceID),0.0,0.0,0.0);}",
        Target::GlslEs2,
        &Options::default(),
    )
    .unwrap();
    assert!(t
        .source
        .contains("#extension GL_EXT_draw_instanced : enable\n"));
    assert!(t.source.contains("gl_InstanceIDEXT"));
}

#[test]
fn es2_external_samplers_convert_and_pull_in_the_extension() {
    let t = translate(
        "uniform samplerExternal video;\nvarying vec2 uv;\n\
         void main(){gl_FragColor=texture2D(video,uv);}",
        Target::GlslEs2,
        &Options::default(),
    )
    .unwrap();
    assert!(t
        .source
        .contains("#extension GL_OES_EGL_image_external : require\n"));
    assert!(t.source.contains("uniform samplerExternalOES video;"));
    assert_eq!(t.uniforms.len(), 1);
    assert_eq!(t.uniforms[0].name, "video");
    assert_eq!(t.uniforms[0].ty, VarType::SamplerExternal);
}

#[test]
fn es2_per_component_builtins_are_opt_in() {
    let src = "void main(){gl_FragColor=vec4(pow(c,g),0.0,0.0,1.0);}";
    let plain = translate(src, Target::GlslEs2, &Options::default()).unwrap();
    assert!(!plain.source.contains("_xc_pow"));

    let opts = Options {
        es2_per_component_builtins: true,
        ..Options::default()
    };
    let fixed = translate(src, Target::GlslEs2, &opts).unwrap();
    assert!(fixed
        .source
        .contains("vec4 _xc_pow(vec4 a0,vec4 a1){return vec4(pow(a0.x,a1.x),pow(a0.y,a1.y),pow(a0.z,a1.z),pow(a0.w,a1.w));}"));
    assert!(fixed.source.contains("_xc_pow(c,g)"));
}

#[test]
fn legacy_only_adds_extension_pragmas() {
    let src = "uniform vec4 tint;\nvoid main(){gl_Position=gl_Vertex*float(gl_InstanceID);}";
    let t = translate(src, Target::GlslLegacy, &Options::default()).unwrap();
    assert!(t
        .source
        .starts_with("#extension GL_ARB_draw_instanced:enable\n"));
    assert!(t.source.contains("gl_InstanceIDARB"));
    // The body is otherwise untouched; declarations stay in place.
    assert!(t.source.contains("uniform vec4 tint;"));
    assert_eq!(t.uniforms.len(), 1);
    assert_eq!(t.uniforms[0].name, "tint");
}

#[test]
fn legacy_vertex_id_pragma_comes_first() {
    let t = translate(
        "void main(){gl_Position=gl_Vertex+vec4(float(gl_VertexID),float(gl_InstanceID),0.0,0.0);}",
        Target::GlslLegacy,
        &Options::default(),
    )
    .unwrap();
    assert!(t
        .source
        .starts_with("#extension GL_EXT_gpu_shader4:require\n#extension GL_ARB_draw_instanced:enable\n"));
}

use pretty_assertions::assert_eq;
use prism_shader::{translate, Options, Stage, Target, TranslateError, VarType};

fn hlsl(src: &str) -> prism_shader::Translation {
    translate(src, Target::Hlsl, &Options::default()).unwrap()
}

#[test]
fn vertex_shader_full_pipeline() {
    let t = hlsl(
        "uniform mat4 bones;\n\
         varying vec2 uv;\n\
         void main(){uv=gl_MultiTexCoord0.xy;gl_Position=gl_ModelViewProjectionMatrix*gl_Vertex;}",
    );
    assert_eq!(t.stage, Stage::Vertex);
    assert!(t.source.starts_with("#define DIRECTX11 1\n"));
    assert!(t
        .source
        .contains("cbuffer _xc_constant_buffer:register(b0){matrix _xc_ModelViewProjectionMatrix;}"));
    assert!(t
        .source
        .contains("struct _xc_vsin{float4 Vertex:POSITION;float4 MultiTexCoord0:TEXCOORD0;};"));
    assert!(t
        .source
        .contains("struct _xc_vsout{float4 _xc_Position:SV_POSITION;float2 uv:TEXCOORD0;};"));
    assert!(t
        .source
        .contains("_xc_Position=mul(_xc_ModelViewProjectionMatrix,_xc_in.Vertex);"));
    assert!(t.source.contains(
        "_xc_vsout main(_xc_vsin _xc_in_){_xc_in=_xc_in_;_xc_main();\
         _xc_vsout _xc_out;_xc_out._xc_Position=_xc_Position;_xc_out.uv=uv;return _xc_out;}"
    ));
    assert!(t
        .source
        .contains("cbuffer _xc_uniforms_buffer:register(b1){float4x4 bones;}"));

    let names: Vec<_> = t.uniforms.iter().map(|v| v.name.as_str()).collect();
    assert_eq!(names, ["_xc_ModelViewProjectionMatrix", "bones"]);
    let attrs: Vec<_> = t.attributes.iter().map(|v| v.name.as_str()).collect();
    assert_eq!(attrs, ["Vertex", "MultiTexCoord0"]);
}

#[test]
fn fragment_shader_samplers_and_wrapper() {
    let t = hlsl(
        "uniform sampler2D diffuse;\n\
         varying vec2 uv;\n\
         void main(){gl_FragColor=texture2D(diffuse,uv)*0.5;}",
    );
    assert_eq!(t.stage, Stage::Fragment);
    assert!(t
        .source
        .contains("Texture2D diffuse: register(t0); SamplerState diffuse_xc_st: register(s0);"));
    assert!(t
        .source
        .contains("#define texture2D(a,b) a.Sample(a##_xc_st,(b))"));
    // Scalar multiply by a literal stays a `*`.
    assert!(t.source.contains("texture2D(diffuse,uv)*0.5"));
    assert!(t.source.contains(
        "float4 main(_xc_vsout _xc_in):SV_TARGET{uv=_xc_in.uv;_xc_main();return _xc_FragColor;}"
    ));
    assert_eq!(t.uniforms[0].ty, VarType::Sampler2d);
}

#[test]
fn projected_texture_lookup_goes_through_the_divide_helper() {
    let t = hlsl(
        "uniform sampler2D shadow_map;\n\
         varying vec4 shadow_pos;\n\
         void main(){gl_FragColor=texture2DProj(shadow_map,shadow_pos);}",
    );
    assert!(t.source.contains(
        "Texture2D shadow_map: register(t0); SamplerState shadow_map_xc_st: register(s0);"
    ));
    assert!(t
        .source
        .contains("float2 _xc_tc_proj(float3 tc){return tc.xy/tc.z;}\n"));
    assert!(t
        .source
        .contains("float2 _xc_tc_proj(float4 tc){return tc.xy/tc.w;}\n"));
    assert!(t
        .source
        .contains("#define texture2DProj(a,b) a.Sample(a##_xc_st,_xc_tc_proj(b))"));
    // The plain texture2D macro is not pulled in by the Proj spelling.
    assert!(!t.source.contains("#define texture2D(a,b)"));
    assert!(t
        .source
        .contains("_xc_FragColor=texture2DProj(shadow_map,shadow_pos);"));
}

#[test]
fn uniform_buffers_are_sorted_by_name() {
    let t = hlsl(
        "uniform vec4 zebra;uniform float apple;uniform vec2 mango;\n\
         void main(){gl_FragColor=zebra+apple*mango.xyxy;}",
    );
    assert!(t.source.contains(
        "cbuffer _xc_uniforms_buffer:register(b2){float apple;float2 mango;float4 zebra;}"
    ));
    let names: Vec<_> = t.uniforms.iter().map(|v| v.name.as_str()).collect();
    assert_eq!(names, ["apple", "mango", "zebra"]);
}

#[test]
fn single_argument_constructors_go_through_cast_helpers() {
    let t = hlsl("void main(){gl_FragColor=vec4(0.25);}");
    assert!(t
        .source
        .contains("float4 _xc_cast_float4(float a){return float4(a,a,a,a);}"));
    assert!(t.source.contains("_xc_FragColor=_xc_cast_float4(0.25);"));
}

#[test]
fn pow_is_wrapped_against_negative_bases() {
    let t = hlsl("void main(){gl_FragColor=vec4(pow(x,2.0),0.0,0.0,1.0);}");
    assert!(t.source.contains("#define _xc_pow(f,e) pow(abs(f),e)"));
    assert!(t.source.contains("_xc_pow(x,2.0)"));
}

#[test]
fn flip_y_multiplies_position_after_main() {
    let opts = Options {
        flip_y_uniform: Some("_xc_flip_y".to_owned()),
        ..Options::default()
    };
    let t = translate(
        "void main(){gl_Position=gl_Vertex;}",
        Target::Hlsl,
        &opts,
    )
    .unwrap();
    assert!(t
        .source
        .contains("cbuffer _xc_constant_buffer:register(b0){float _xc_flip_y;}"));
    assert!(t.source.contains("_xc_out._xc_Position.y*=_xc_flip_y;"));
}

#[test]
fn instance_id_becomes_input_struct_member() {
    let t = hlsl("void main(){gl_Position=gl_Vertex+vec4(float(gl_InstanceID),0.0,0.0,0.0);}");
    assert!(t.source.contains("uint _xc_InstanceID:SV_InstanceID;"));
    assert!(t.source.contains("_xc_in._xc_InstanceID"));
}

#[test]
fn missing_main_is_an_error() {
    let err = translate(
        "void mane(){gl_FragColor=vec4(1.0);}",
        Target::Hlsl,
        &Options::default(),
    )
    .unwrap_err();
    assert_eq!(err, TranslateError::MainNotFound);
}

#[test]
fn comments_never_reach_the_output() {
    let t = hlsl("// per-object tint\nuniform vec4 tint;/* mixed\nin */void main(){gl_FragColor=tint;}");
    assert!(!t.source.contains("per-object"));
    assert!(!t.source.contains("mixed"));
    assert_eq!(t.uniforms[0].name, "tint");
}

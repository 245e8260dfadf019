//! HLSL (DirectX 11) backend.
//!
//! Predefined matrix uniforms land in `b0`, user uniforms in `b1`
//! (vertex) or `b2` (fragment); both buffers are emitted in name
//! order so the binding layer can lay them out without parsing the
//! output. Samplers become `Texture2D`/`TextureCube` + `SamplerState`
//! pairs, and the stage interface goes through synthesized
//! `vsin`/`vsout` structs wrapped around the renamed `main`.

use prism_glsl::{decl, VarType, Variable};

use crate::{mul, rewrite, Conversion, TranslateError};

pub(crate) fn convert(cv: &mut Conversion) -> Result<(), TranslateError> {
    let prefix = cv.prefix().to_owned();
    let mut prologue = String::from("#define DIRECTX11 1\n");

    decl::collect_predefined_matrices(&mut cv.buf, &prefix, true, &mut cv.uniforms);
    if let Some(flip) = &cv.opts.flip_y_uniform {
        cv.uniforms
            .push_unique(Variable::new(flip.clone(), VarType::Float, 1));
    }
    if !cv.uniforms.is_empty() {
        cv.uniforms.sort_by_name();
        prologue.push_str(&format!("cbuffer {prefix}constant_buffer:register(b0){{"));
        for v in &cv.uniforms {
            let ty = if v.ty == VarType::Float { "float" } else { "matrix" };
            prologue.push_str(&format!("{ty} {};", v.name));
        }
        prologue.push_str("}\n");
    }
    let predefined_count = cv.uniforms.len();

    cv.parse_uniforms(true)?;
    cv.uniforms.sort_range_by_name(predefined_count);
    cv.parse_varyings(true)?;
    cv.varyings.sort_by_name();

    let cast = format!("{prefix}cast_float");
    if rewrite::replace_vec_from_float(&mut cv.buf, &cast) {
        for dim in 2..=4usize {
            let splat = ["a"; 4][..dim].join(",");
            prologue.push_str(&format!(
                "float{dim} {cast}{dim}(float a){{return float{dim}({splat});}} \
                 float{dim} {cast}{dim}(float{dim} a){{return a;}}\n"
            ));
        }
    }

    mul::replace_matrix_mul(&mut cv.buf, &cv.uniforms, &cv.varyings, "mul")?;
    rewrite::replace_vector_types(&mut cv.buf);

    cv.buf.replace_ident("mix", "lerp");
    cv.buf.replace_ident("fract", "frac");
    cv.buf.replace_ident("inversesqrt", "rsqrt");
    // HLSL's pow warns and misbehaves on negative bases; route every
    // call through an abs-wrapping macro.
    if cv.buf.replace_ident("pow", &format!("{prefix}pow")) {
        prologue.push_str(&format!("#define {prefix}pow(f,e) pow(abs(f),e)\n"));
    }

    let mut samplers = 0u32;
    for v in &cv.uniforms.as_slice()[predefined_count..] {
        let tex_ty = match v.ty {
            VarType::Sampler2d => "Texture2D",
            VarType::SamplerCube => "TextureCube",
            _ => continue,
        };
        prologue.push_str(&format!(
            "{tex_ty} {name}: register(t{samplers}); \
             SamplerState {name}{prefix}st: register(s{samplers});\n",
            name = v.name
        ));
        samplers += 1;
    }
    if samplers > 0 {
        rewrite::append_texture_macros(&cv.buf, &mut prologue, &prefix, "Sample");
    }

    let pos_out = format!("{prefix}Position");
    prologue.push_str(&format!(
        "struct {prefix}vsout{{float4 {pos_out}:SV_POSITION;"
    ));
    let mut reg = 0u32;
    for v in &cv.varyings {
        let Some(ty) = v.ty.hlsl_name() else { continue };
        prologue.push_str(&format!("{ty} {}:TEXCOORD{reg};", v.name));
        reg += v.ty.register_size();
    }
    prologue.push_str("};\n");

    let input_var = format!("{prefix}in");
    let frag_out = format!("{prefix}FragColor");
    let is_fragment = cv.buf.replace_ident("gl_FragColor", &frag_out);

    if is_fragment {
        prologue.push_str(&format!("static float4 {frag_out};\n"));
        if !rewrite::replace_main_header(&mut cv.buf, &format!("void {prefix}main()")) {
            return Err(TranslateError::MainNotFound);
        }
        let mut in_assign = String::new();
        for v in &cv.varyings {
            let Some(ty) = v.ty.hlsl_name() else { continue };
            prologue.push_str(&format!("static {ty} {};", v.name));
            in_assign.push_str(&format!("{n}={input_var}.{n};", n = v.name));
        }
        prologue.push('\n');
        cv.buf.append(&format!(
            "\nfloat4 main({prefix}vsout {input_var}):SV_TARGET\
             {{{in_assign}{prefix}main();return {frag_out};}}\n"
        ));
    } else {
        decl::collect_predefined_attributes(
            &mut cv.buf,
            &prefix,
            Some(&format!("{input_var}.")),
            &mut cv.attributes,
        );
        // The struct members and the reported table both carry the
        // bare names (`Vertex`, not `{prefix}Vertex`); the binding
        // layer matches on those.
        for a in cv.attributes.iter_mut() {
            if let Some(bare) = a.name.strip_prefix(&prefix) {
                a.name = bare.to_owned();
            }
        }
        prologue.push_str(&format!("struct {prefix}vsin{{"));
        let mut reg = 0u32;
        for a in &cv.attributes {
            match a.name.as_str() {
                "Vertex" => prologue.push_str("float4 Vertex:POSITION;"),
                "Normal" => prologue.push_str("float3 Normal:NORMAL;"),
                "Color" => prologue.push_str("float4 Color:COLOR;"),
                _ => {
                    prologue.push_str(&format!("float4 {}:TEXCOORD{reg};", a.name));
                    reg += a.ty.register_size();
                }
            }
        }
        let instance = format!("{prefix}InstanceID");
        if cv
            .buf
            .replace_ident("gl_InstanceID", &format!("{input_var}.{instance}"))
        {
            prologue.push_str(&format!("uint {instance}:SV_InstanceID;"));
        }
        prologue.push_str("};\n");
        prologue.push_str(&format!("static {prefix}vsin {input_var};\n"));

        if !rewrite::replace_main_header(&mut cv.buf, &format!("void {prefix}main()")) {
            return Err(TranslateError::MainNotFound);
        }
        cv.buf.replace_ident("gl_Position", &pos_out);

        let out_var = format!("{prefix}out");
        let mut out_assign = format!("{out_var}.{pos_out}={pos_out};");
        prologue.push_str(&format!("static float4 {pos_out};"));
        for v in &cv.varyings {
            let Some(ty) = v.ty.hlsl_name() else { continue };
            prologue.push_str(&format!("static {ty} {};", v.name));
            out_assign.push_str(&format!("{out_var}.{n}={n};", n = v.name));
        }
        prologue.push('\n');
        if let Some(flip) = &cv.opts.flip_y_uniform {
            out_assign.push_str(&format!("{out_var}.{pos_out}.y*={flip};"));
        }

        cv.buf.append(&format!(
            "\n{prefix}vsout main({prefix}vsin {input_var}_)\
             {{{input_var}={input_var}_;{prefix}main();\
             {prefix}vsout {out_var};{out_assign}return {out_var};}}\n"
        ));
    }

    if cv.uniforms.len() > predefined_count {
        let reg = if is_fragment { "b2" } else { "b1" };
        prologue.push_str(&format!(
            "cbuffer {prefix}uniforms_buffer:register({reg}){{"
        ));
        for v in &cv.uniforms.as_slice()[predefined_count..] {
            let Some(ty) = v.ty.hlsl_name() else { continue };
            if v.array_size > 1 {
                prologue.push_str(&format!("{ty} {}[{}];", v.name, v.array_size));
            } else {
                prologue.push_str(&format!("{ty} {};", v.name));
            }
        }
        prologue.push_str("}\n");
    }

    cv.buf.prepend(&prologue);
    Ok(())
}

//! Metal Shading Language backend.
//!
//! Metal has no shader-global variables: uniforms live in an argument
//! struct, samplers are texture/sampler parameter pairs, and every
//! helper function that might touch them needs those resources
//! threaded through its parameter list. The threading runs in two
//! phases over the comment-free buffer: a single brace-depth scan
//! records every function header, body and call site as byte spans,
//! then the edits are applied against those original offsets from the
//! end of the buffer backwards, so no span is invalidated by an
//! earlier edit.

use std::ops::Range;

use tracing::debug;

use prism_glsl::{decl, SourceBuffer, VarType};

use crate::{rewrite, Conversion, Stage, TranslateError};

pub(crate) fn convert(cv: &mut Conversion) -> Result<(), TranslateError> {
    let prefix = cv.prefix().to_owned();
    let mut prologue =
        String::from("#include <metal_stdlib>\n#include <simd/simd.h>\nusing namespace metal;\n");

    decl::collect_predefined_matrices(&mut cv.buf, &prefix, true, &mut cv.uniforms);
    cv.parse_uniforms(true)?;
    cv.uniforms.sort_by_name();
    cv.parse_varyings(true)?;
    cv.varyings.sort_by_name();

    let uniforms_type = format!("{prefix}uniforms");
    let uniforms_name = format!("{prefix}u");
    // Samplers are threaded as texture arguments, not struct members;
    // an all-sampler uniform set needs no argument struct at all.
    let has_buffer_uniforms = cv.uniforms.iter().any(|v| !v.ty.is_sampler());
    if has_buffer_uniforms {
        prologue.push_str(&format!("struct {uniforms_type}{{"));
        let renames: Vec<(String, String)> = cv
            .uniforms
            .iter()
            .filter(|v| !v.ty.is_sampler())
            .map(|v| (v.name.clone(), format!("{uniforms_name}.{}", v.name)))
            .collect();
        for v in &cv.uniforms {
            let Some(ty) = v.ty.hlsl_name() else { continue };
            if v.array_size > 1 {
                prologue.push_str(&format!("{ty} {}[{}];", v.name, v.array_size));
            } else {
                prologue.push_str(&format!("{ty} {};", v.name));
            }
        }
        prologue.push_str("};\n");
        for (from, to) in &renames {
            cv.buf.replace_ident(from, to);
        }
    }

    let is_fragment = cv.buf.replace_ident("gl_FragColor", "out");

    let pos_out = format!("{prefix}Position");
    let varying_type = format!("{prefix}varying");
    if !cv.varyings.is_empty() || !is_fragment {
        prologue.push_str(&format!("struct {varying_type}{{"));
        if !is_fragment {
            prologue.push_str(&format!("float4 {pos_out}[[position]];"));
        }
        for v in &cv.varyings {
            let Some(ty) = v.ty.hlsl_name() else { continue };
            prologue.push_str(&format!("{ty} {};", v.name));
        }
        prologue.push_str("};\n");
    }

    let mut args = ArgBuilder::default();

    let mut samplers = 0u32;
    for v in &cv.uniforms {
        let tex_ty = match v.ty {
            VarType::Sampler2d => "texture2d<float>",
            VarType::SamplerCube => "texturecube<float>",
            _ => continue,
        };
        args.add(tex_ty, &v.name, &format!("[[texture({samplers})]]"));
        args.add(
            "sampler",
            &format!("{}{prefix}st", v.name),
            &format!("[[sampler({samplers})]]"),
        );
        samplers += 1;
    }
    if samplers > 0 {
        rewrite::append_texture_macros(&cv.buf, &mut prologue, &prefix, "sample");
    }

    let out_decl;
    let main_type;
    if is_fragment {
        main_type = "fragment float4".to_owned();
        out_decl = "\nfloat4 out;\n".to_owned();

        if !cv.varyings.is_empty() {
            args.add(&varying_type, "in", "[[stage_in]]");
            let renames: Vec<(String, String)> = cv
                .varyings
                .iter()
                .map(|v| (v.name.clone(), format!("in.{}", v.name)))
                .collect();
            for (from, to) in &renames {
                cv.buf.replace_ident(from, to);
            }
        }
        if has_buffer_uniforms {
            args.add(
                &format!("constant {uniforms_type}&"),
                &uniforms_name,
                "[[buffer(0)]]",
            );
        }
    } else {
        main_type = format!("vertex {varying_type}");
        out_decl = format!("\n{varying_type} out;\n");

        let vertex_type = format!("{prefix}vsin");
        args.add(&vertex_type, "in", "[[stage_in]]");

        decl::collect_predefined_attributes(&mut cv.buf, &prefix, Some("in."), &mut cv.attributes);
        for a in cv.attributes.iter_mut() {
            if let Some(bare) = a.name.strip_prefix(&prefix) {
                a.name = bare.to_owned();
            }
        }
        prologue.push_str(&format!("struct {vertex_type}{{ "));
        for a in &cv.attributes {
            match a.name.as_str() {
                "Vertex" => prologue.push_str("float4 Vertex[[attribute(0)]];"),
                "Normal" => prologue.push_str("float3 Normal[[attribute(1)]];"),
                "Color" => prologue.push_str("float4 Color[[attribute(2)]];"),
                _ => prologue.push_str(&format!(
                    "float4 {}[[attribute({})]];",
                    a.name,
                    a.slot + 3
                )),
            }
        }
        prologue.push_str("};\n");

        let vertex_id = format!("{prefix}VertexID");
        if cv.buf.replace_ident("gl_VertexID", &vertex_id) {
            args.add("uint", &vertex_id, "[[vertex_id]]");
        }
        let instance_id = format!("{prefix}InstanceID");
        if cv.buf.replace_ident("gl_InstanceID", &instance_id) {
            args.add("uint", &instance_id, "[[instance_id]]");
        }

        let renames: Vec<(String, String)> = cv
            .varyings
            .iter()
            .map(|v| (v.name.clone(), format!("out.{}", v.name)))
            .collect();
        for (from, to) in &renames {
            cv.buf.replace_ident(from, to);
        }
        cv.buf.replace_ident("gl_Position", &format!("out.{pos_out}"));

        if has_buffer_uniforms {
            args.add(
                &format!("constant {uniforms_type}&"),
                &uniforms_name,
                "[[buffer(1)]]",
            );
        }
    }

    rewrite::replace_vector_types(&mut cv.buf);
    cv.buf.replace_ident("discard", "discard_fragment()");

    thread_resource_args(&mut cv.buf, &args, &out_decl, &main_type, &prefix)?;

    cv.buf.prepend(&prologue);
    let stage = if is_fragment { Stage::Fragment } else { Stage::Vertex };
    debug!(?stage, samplers, uniforms = cv.uniforms.len(), "converted shader to metal");
    Ok(())
}

/// The three spellings of the threaded resource list: `decl` goes
/// into helper parameter lists, `call` into call sites, `main` (with
/// binding attributes) into the entry-point signature.
#[derive(Default)]
struct ArgBuilder {
    decl: String,
    call: String,
    main: String,
}

impl ArgBuilder {
    fn add(&mut self, ty: &str, name: &str, attribute: &str) {
        if !self.decl.is_empty() {
            self.decl.push(',');
            self.call.push(',');
            self.main.push(',');
        }
        self.decl.push_str(&format!("{ty} {name}"));
        self.call.push_str(name);
        self.main.push_str(&format!("{ty} {name}{attribute}"));
    }

    fn is_empty(&self) -> bool {
        self.call.is_empty()
    }
}

/// One deferred edit against the pre-scan buffer. Inserts have an
/// empty range.
struct Edit {
    range: Range<usize>,
    text: String,
}

impl Edit {
    fn insert(at: usize, text: String) -> Self {
        Self { range: at..at, text }
    }

    fn replace(range: Range<usize>, text: String) -> Self {
        Self { range, text }
    }
}

/// Result of scanning one function header.
struct Header {
    name: Range<usize>,
    /// Offset right after the parameter list's `(`.
    arg_insert: usize,
    /// Whether the list already has parameters (so the threaded list
    /// needs a trailing comma).
    has_params: bool,
    /// Span of a lone `void` parameter, which must give way to the
    /// threaded list.
    void_param: Option<Range<usize>>,
}

/// Rewrites every function in the buffer so resources flow from the
/// entry point down: helpers gain `inline` and the plain parameter
/// list, `main` gains the attributed list plus the synthesized `out`
/// local and trailing `return out;`, and calls to already-scanned
/// helpers gain the argument list.
fn thread_resource_args(
    buf: &mut SourceBuffer,
    args: &ArgBuilder,
    out_decl: &str,
    main_type: &str,
    prefix: &str,
) -> Result<(), TranslateError> {
    let src = buf.as_str().to_owned();
    let b = src.as_bytes();

    let mut edits: Vec<Edit> = Vec::new();
    let mut helpers: Vec<String> = Vec::new();
    let mut depth = 0i32;
    let mut body_start = 0usize;
    let mut in_main = false;
    let mut found_main = false;

    let mut i = 0;
    while i < b.len() {
        match b[i] {
            b'{' => {
                depth += 1;
                if depth == 1 {
                    let header = scan_header(&src, i)?;
                    let name = &src[header.name.clone()];
                    in_main = name == "main";
                    if in_main {
                        found_main = true;
                        let ret = src[..header.name.start]
                            .rfind("void")
                            .ok_or(TranslateError::MainNotVoid)?;
                        edits.push(Edit::replace(ret..ret + 4, main_type.to_owned()));
                        edits.push(Edit::insert(header.name.start, prefix.to_owned()));
                        if !args.is_empty() {
                            push_param_edits(&mut edits, &header, &args.main);
                        }
                        edits.push(Edit::insert(i + 1, out_decl.to_owned()));
                    } else {
                        edits.push(Edit::insert(header.name.start, "inline ".to_owned()));
                        if !args.is_empty() {
                            push_param_edits(&mut edits, &header, &args.decl);
                        }
                        helpers.push(name.to_owned());
                    }
                    body_start = i + 1;
                }
            }
            b'}' => {
                depth -= 1;
                if depth < 0 {
                    return Err(TranslateError::UnbalancedBraces);
                }
                if depth == 0 {
                    if in_main {
                        edits.push(Edit::insert(i, "\nreturn out;\n".to_owned()));
                        in_main = false;
                    }
                    if !args.is_empty() {
                        record_call_sites(&src, body_start..i, &helpers, &args.call, &mut edits);
                    }
                }
            }
            _ => {}
        }
        i += 1;
    }
    if depth != 0 {
        return Err(TranslateError::UnbalancedBraces);
    }
    if !found_main {
        return Err(TranslateError::MainNotFound);
    }

    // Applied back-to-front. Among edits at the same offset, a `void`
    // parameter (larger end) is consumed before anything is inserted
    // there, and later-recorded inserts go in first so they end up
    // after earlier ones in the output.
    let mut order: Vec<usize> = (0..edits.len()).collect();
    order.sort_by(|&x, &y| {
        edits[y]
            .range
            .start
            .cmp(&edits[x].range.start)
            .then(edits[y].range.end.cmp(&edits[x].range.end))
            .then(y.cmp(&x))
    });
    for idx in order {
        let e = &edits[idx];
        buf.replace_range(e.range.clone(), &e.text);
    }
    Ok(())
}

fn push_param_edits(edits: &mut Vec<Edit>, header: &Header, list: &str) {
    if let Some(void_param) = header.void_param.clone() {
        edits.push(Edit::replace(void_param, String::new()));
    }
    let text = if header.has_params {
        format!("{list},")
    } else {
        list.to_owned()
    };
    edits.push(Edit::insert(header.arg_insert, text));
}

/// Walks backwards from a depth-one `{` to the function's name and
/// parameter list.
fn scan_header(src: &str, body_open: usize) -> Result<Header, TranslateError> {
    let b = src.as_bytes();
    let lparen = src[..body_open]
        .rfind('(')
        .ok_or_else(|| TranslateError::MalformedFunction("missing parameter list".to_owned()))?;

    let mut name_end = lparen;
    while name_end > 0 && b[name_end - 1].is_ascii_whitespace() {
        name_end -= 1;
    }
    let mut name_start = name_end;
    while name_start > 0 && !b[name_start - 1].is_ascii_whitespace() {
        name_start -= 1;
    }
    if name_start == name_end {
        return Err(TranslateError::MalformedFunction(
            "unnamed function".to_owned(),
        ));
    }

    // Classify the existing parameter list: empty, a lone `void`, or
    // real parameters.
    let mut has_params = false;
    let mut void_param = None;
    let mut j = lparen + 1;
    while j < b.len() && b[j] != b')' {
        if b[j].is_ascii_whitespace() {
            j += 1;
            continue;
        }
        if !has_params && void_param.is_none() && is_lone_void(src, j) {
            void_param = Some(j..j + 4);
            j += 4;
            continue;
        }
        has_params = true;
        j += 1;
    }

    Ok(Header {
        name: name_start..name_end,
        arg_insert: lparen + 1,
        has_params,
        void_param,
    })
}

/// Whole-token `void` at `at`, so identifiers like `void4` are left
/// alone.
fn is_lone_void(src: &str, at: usize) -> bool {
    src[at..].starts_with("void")
        && !matches!(
            src.as_bytes().get(at + 4),
            Some(&c) if prism_glsl::buffer::is_ident_char(c)
        )
}

/// Records an argument-list insertion for every call to a known
/// helper inside `body`.
fn record_call_sites(
    src: &str,
    body: Range<usize>,
    helpers: &[String],
    call: &str,
    edits: &mut Vec<Edit>,
) {
    let b = src.as_bytes();
    for name in helpers {
        let mut pos = body.start;
        while let Some(found) = src[pos..body.end].find(name.as_str()) {
            let at = pos + found;
            pos = at + 1;
            let after = at + name.len();
            if at > 0 && prism_glsl::buffer::is_ident_char(b[at - 1]) {
                continue;
            }
            if after < b.len() && prism_glsl::buffer::is_ident_char(b[after]) {
                continue;
            }
            let Some(off) = src[after..body.end].find('(') else {
                continue;
            };
            let lparen = after + off;
            // Only whitespace may sit between the name and `(`;
            // anything else means this is not a call.
            if !src[after..lparen].chars().all(char::is_whitespace) {
                continue;
            }
            // A lone `void` between the parentheses counts as an
            // empty list, same as on the declaration side.
            let mut has_args = false;
            let mut void_arg = None;
            let mut j = lparen + 1;
            while j < b.len() && b[j] != b')' {
                if b[j].is_ascii_whitespace() {
                    j += 1;
                    continue;
                }
                if void_arg.is_none() && is_lone_void(src, j) {
                    void_arg = Some(j..j + 4);
                    j += 4;
                    continue;
                }
                has_args = true;
                break;
            }
            let text = if has_args {
                format!("{call},")
            } else {
                if let Some(void_arg) = void_arg {
                    edits.push(Edit::replace(void_arg, String::new()));
                }
                call.to_owned()
            };
            edits.push(Edit::insert(lparen + 1, text));
            pos = lparen + 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn thread(src: &str, args: &ArgBuilder) -> Result<String, TranslateError> {
        let mut buf = SourceBuffer::new(src);
        thread_resource_args(&mut buf, args, "\nfloat4 out;\n", "fragment float4", "_xc_")?;
        Ok(buf.into_string())
    }

    fn tex_args() -> ArgBuilder {
        let mut args = ArgBuilder::default();
        args.add("texture2d<float>", "tex", "[[texture(0)]]");
        args.add("sampler", "tex_xc_st", "[[sampler(0)]]");
        args
    }

    #[test]
    fn main_gains_entry_signature_and_out() {
        let got = thread("void main(){out=f;}", &tex_args()).unwrap();
        assert_eq!(
            got,
            "fragment float4 _xc_main(texture2d<float> tex[[texture(0)]],\
             sampler tex_xc_st[[sampler(0)]]){\nfloat4 out;\nout=f;\nreturn out;\n}"
        );
    }

    #[test]
    fn helper_and_call_site_are_threaded() {
        let got = thread(
            "float4 get(float2 tc){return texture2D(tex,tc);}\nvoid main(){out=get(uv);}",
            &tex_args(),
        )
        .unwrap();
        assert_eq!(
            got,
            "inline float4 get(texture2d<float> tex,sampler tex_xc_st,float2 tc)\
             {return texture2D(tex,tc);}\n\
             fragment float4 _xc_main(texture2d<float> tex[[texture(0)]],\
             sampler tex_xc_st[[sampler(0)]])\
             {\nfloat4 out;\nout=get(tex,tex_xc_st,uv);\nreturn out;\n}"
        );
    }

    #[test]
    fn zero_argument_call_gets_no_trailing_comma() {
        let mut args = ArgBuilder::default();
        args.add("texture2d<float>", "tex", "[[texture(0)]]");
        let got = thread(
            "float4 peek(){return texture2D(tex,float2(0.0));}\nvoid main(){out=peek();}",
            &args,
        )
        .unwrap();
        assert!(got.contains("out=peek(tex);"));
        assert!(got.contains("inline float4 peek(texture2d<float> tex)"));
    }

    #[test]
    fn lone_void_parameter_is_replaced() {
        let got = thread("void main(void){out=f;}", &tex_args()).unwrap();
        assert!(got.starts_with(
            "fragment float4 _xc_main(texture2d<float> tex[[texture(0)]],\
             sampler tex_xc_st[[sampler(0)]])"
        ));
    }

    #[test]
    fn lone_void_call_argument_gives_way_to_the_threaded_list() {
        let mut args = ArgBuilder::default();
        args.add("texture2d<float>", "tex", "[[texture(0)]]");
        let got = thread(
            "float4 peek(void){return texture2D(tex,float2(0.5));}\n\
             void main(){out=peek(void);}",
            &args,
        )
        .unwrap();
        assert!(got.contains("inline float4 peek(texture2d<float> tex)"));
        assert!(got.contains("out=peek(tex);"));
    }

    #[test]
    fn void_prefixed_parameter_names_are_not_blanked() {
        let got = thread("float4 f(float2 voided){return g;}\nvoid main(){out=f(uv);}", &tex_args())
            .unwrap();
        assert!(got.contains("inline float4 f(texture2d<float> tex,sampler tex_xc_st,float2 voided)"));
        assert!(got.contains("out=f(tex,tex_xc_st,uv);"));
    }

    #[test]
    fn unbalanced_braces_are_rejected() {
        let err = thread("void main(){out=f;", &tex_args()).unwrap_err();
        assert_eq!(err, TranslateError::UnbalancedBraces);
    }

    #[test]
    fn non_void_main_is_rejected() {
        let err = thread("float4 main(){return f;}", &tex_args()).unwrap_err();
        assert_eq!(err, TranslateError::MainNotVoid);
    }
}

//! Shader cross-compiler: rewrites a shader written in the engine's
//! GLSL 1.x-flavored source dialect (implicit `gl_*` built-ins, no
//! version pragma) into one of five target shading dialects, at the
//! text/token level.
//!
//! This is deliberately not a GLSL front end. There is no AST and no
//! type inference; the input is assumed to already compile under the
//! source dialect, and the passes perform a bounded set of
//! lexical/structural rewrites over a mutable buffer. Each call to
//! [`translate`] owns its buffer and variable tables outright, so
//! conversions are synchronous, deterministic, and freely concurrent
//! across threads.

mod es2;
mod glsl3;
mod hlsl;
mod legacy;
mod metal;
mod mul;
mod rewrite;

use thiserror::Error;

use prism_glsl::{decl, DeclError, SourceBuffer, VarTable};

pub use prism_glsl::builtins;
pub use prism_glsl::{VarType, Variable};

/// Target shading dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    /// Desktop HLSL for DirectX 11.
    Hlsl,
    /// Metal Shading Language.
    Metal,
    /// GLSL 3.3 core, upgraded to 4.0 when GL4-only built-ins appear.
    Glsl3,
    /// GLSL ES 2.0.
    GlslEs2,
    /// Legacy desktop GLSL: extension pragmas only, no structural
    /// rewriting.
    GlslLegacy,
}

/// Pipeline stage, inferred from the source: a shader that references
/// `gl_FragColor` is a fragment shader, anything else is a vertex
/// shader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Vertex,
    Fragment,
}

/// Default float precision for the GLSL ES 2.0 target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Precision {
    Lowp,
    #[default]
    Mediump,
    Highp,
}

impl Precision {
    pub fn glsl_name(self) -> &'static str {
        match self {
            Precision::Lowp => "lowp",
            Precision::Mediump => "mediump",
            Precision::Highp => "highp",
        }
    }
}

/// Per-conversion configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Unique prefix for built-in renames and synthesized helpers, so
    /// they cannot collide with user identifiers.
    pub prefix: String,
    /// HLSL only: name of a float uniform multiplied into the
    /// clip-space Y coordinate after `main` runs. `None` disables the
    /// flip entirely.
    pub flip_y_uniform: Option<String>,
    /// Default float precision appended to GLSL ES 2.0 output.
    pub es2_precision: Precision,
    /// GLSL ES 2.0 only: wrap `pow`/`sqrt` in synthesized
    /// per-component overloads. Some mobile GL drivers reject the
    /// vector forms the spec requires them to accept.
    pub es2_per_component_builtins: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            prefix: "_xc_".to_owned(),
            flip_y_uniform: None,
            es2_precision: Precision::Mediump,
            es2_per_component_builtins: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslateError {
    #[error("unable to parse {table} declarations: {source}")]
    Decl {
        table: &'static str,
        #[source]
        source: DeclError,
    },
    #[error("main function not found")]
    MainNotFound,
    #[error("invalid main function type, expected `void main`")]
    MainNotVoid,
    #[error("malformed function: {0}")]
    MalformedFunction(String),
    #[error("unbalanced braces in shader body")]
    UnbalancedBraces,
    #[error("unable to parse variables in '*' to 'mul' replacement")]
    MultiplyOperand,
}

/// A successful conversion: the rewritten source plus the variable
/// tables the graphics-API binding layer needs to bind the shader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    pub source: String,
    pub stage: Stage,
    pub uniforms: Vec<Variable>,
    pub attributes: Vec<Variable>,
    pub varyings: Vec<Variable>,
}

/// Non-destructive introspection of an unconverted shader: the same
/// variable sets a conversion would report, without rewriting
/// anything. `outputs` lists `out` declarations, which the engine's
/// transform-feedback path inspects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reflection {
    pub stage: Stage,
    pub uniforms: Vec<Variable>,
    pub attributes: Vec<Variable>,
    pub outputs: Vec<Variable>,
}

/// Converts `source` to the requested target dialect.
///
/// The conversion works on its own copy of the source; on failure the
/// partially rewritten buffer is dropped and never observable.
pub fn translate(
    source: &str,
    target: Target,
    options: &Options,
) -> Result<Translation, TranslateError> {
    let mut cv = Conversion::new(source, options);
    match target {
        Target::Hlsl => hlsl::convert(&mut cv)?,
        Target::Metal => metal::convert(&mut cv)?,
        Target::Glsl3 => glsl3::convert(&mut cv)?,
        Target::GlslEs2 => es2::convert(&mut cv)?,
        Target::GlslLegacy => legacy::convert(&mut cv)?,
    }
    Ok(cv.finish())
}

/// Reports uniforms, predefined attributes and `out` declarations
/// without converting or mutating anything.
pub fn reflect(source: &str, options: &Options) -> Result<Reflection, TranslateError> {
    let mut cv = Conversion::new(source, options);
    decl::collect_predefined_matrices(&mut cv.buf, &options.prefix, false, &mut cv.uniforms);
    cv.parse_uniforms(false)?;
    decl::collect_predefined_attributes(&mut cv.buf, &options.prefix, None, &mut cv.attributes);
    let outputs = decl::parse_declarations(&mut cv.buf, "out", false).map_err(|source| {
        TranslateError::Decl {
            table: "out",
            source,
        }
    })?;
    Ok(Reflection {
        stage: cv.stage,
        uniforms: cv.uniforms.into_vec(),
        attributes: cv.attributes.into_vec(),
        outputs,
    })
}

/// Mutable state owned by one conversion: the buffer every pass edits
/// in place, plus the three variable tables. Never shared; never
/// reused across calls.
pub(crate) struct Conversion<'o> {
    pub(crate) buf: SourceBuffer,
    pub(crate) uniforms: VarTable,
    pub(crate) varyings: VarTable,
    pub(crate) attributes: VarTable,
    pub(crate) opts: &'o Options,
    pub(crate) stage: Stage,
}

impl<'o> Conversion<'o> {
    fn new(source: &str, opts: &'o Options) -> Self {
        let mut buf = SourceBuffer::new(source);
        // Declaration scans and the brace-tracked passes assume
        // comment-free text.
        buf.strip_comments();
        let stage = if buf.contains_ident(builtins::FRAG_COLOR_OUT) {
            Stage::Fragment
        } else {
            Stage::Vertex
        };
        Self {
            buf,
            uniforms: VarTable::new(),
            varyings: VarTable::new(),
            attributes: VarTable::new(),
            opts,
            stage,
        }
    }

    pub(crate) fn prefix(&self) -> &str {
        &self.opts.prefix
    }

    pub(crate) fn parse_uniforms(&mut self, remove: bool) -> Result<(), TranslateError> {
        let vars = decl::parse_declarations(&mut self.buf, "uniform", remove).map_err(
            |source| TranslateError::Decl {
                table: "uniform",
                source,
            },
        )?;
        self.uniforms.extend_unique(vars);
        Ok(())
    }

    pub(crate) fn parse_varyings(&mut self, remove: bool) -> Result<(), TranslateError> {
        let vars = decl::parse_declarations(&mut self.buf, "varying", remove).map_err(
            |source| TranslateError::Decl {
                table: "varying",
                source,
            },
        )?;
        self.varyings.extend_unique(vars);
        Ok(())
    }

    fn finish(self) -> Translation {
        Translation {
            source: self.buf.into_string(),
            stage: self.stage,
            uniforms: self.uniforms.into_vec(),
            attributes: self.attributes.into_vec(),
            varyings: self.varyings.into_vec(),
        }
    }
}

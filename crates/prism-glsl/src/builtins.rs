//! Static table of the `gl_*` built-ins the source dialect exposes.
//!
//! Every backend consults this one table instead of carrying its own
//! literal arrays, so the emitters stay consistent about which
//! built-ins exist and how they are typed.

use crate::var::VarType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinRole {
    /// Engine-supplied mat4 uniform (modelview/projection family).
    MatrixUniform,
    /// Per-vertex input supplied by the vertex buffer.
    Attribute,
    /// Implicit vertex index.
    VertexId,
    /// Implicit instance index.
    InstanceId,
    /// Vertex-stage clip-space output.
    PositionOut,
    /// Fragment-stage color output.
    FragColorOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Builtin {
    pub name: &'static str,
    /// Declared type where one exists in the source grammar; the id
    /// built-ins are integer-typed in every target dialect and carry
    /// no source-grammar type.
    pub ty: Option<VarType>,
    pub role: BuiltinRole,
}

pub const BUILTINS: &[Builtin] = &[
    Builtin {
        name: "gl_ModelViewMatrix",
        ty: Some(VarType::Mat4),
        role: BuiltinRole::MatrixUniform,
    },
    Builtin {
        name: "gl_ModelViewProjectionMatrix",
        ty: Some(VarType::Mat4),
        role: BuiltinRole::MatrixUniform,
    },
    Builtin {
        name: "gl_ProjectionMatrix",
        ty: Some(VarType::Mat4),
        role: BuiltinRole::MatrixUniform,
    },
    Builtin {
        name: "gl_Vertex",
        ty: Some(VarType::Vec4),
        role: BuiltinRole::Attribute,
    },
    Builtin {
        name: "gl_Normal",
        ty: Some(VarType::Vec3),
        role: BuiltinRole::Attribute,
    },
    Builtin {
        name: "gl_Color",
        ty: Some(VarType::Vec4),
        role: BuiltinRole::Attribute,
    },
    Builtin {
        name: "gl_VertexID",
        ty: None,
        role: BuiltinRole::VertexId,
    },
    Builtin {
        name: "gl_InstanceID",
        ty: None,
        role: BuiltinRole::InstanceId,
    },
    Builtin {
        name: "gl_Position",
        ty: Some(VarType::Vec4),
        role: BuiltinRole::PositionOut,
    },
    Builtin {
        name: "gl_FragColor",
        ty: Some(VarType::Vec4),
        role: BuiltinRole::FragColorOut,
    },
];

/// `gl_MultiTexCoordN` is matched by prefix; `N` comes from the
/// literal occurrence.
pub const MULTI_TEXCOORD_PREFIX: &str = "gl_MultiTexCoord";

pub const POSITION_OUT: &str = "gl_Position";
pub const FRAG_COLOR_OUT: &str = "gl_FragColor";
pub const VERTEX_ID: &str = "gl_VertexID";
pub const INSTANCE_ID: &str = "gl_InstanceID";

pub fn matrix_uniforms() -> impl Iterator<Item = &'static Builtin> {
    BUILTINS
        .iter()
        .filter(|b| b.role == BuiltinRole::MatrixUniform)
}

pub fn attributes() -> impl Iterator<Item = &'static Builtin> {
    BUILTINS.iter().filter(|b| b.role == BuiltinRole::Attribute)
}

/// `gl_ModelViewMatrix` -> `ModelViewMatrix`; built-in renames keep
/// the tail and put the conversion's unique prefix in front of it.
pub fn strip_gl(name: &str) -> &str {
    name.strip_prefix("gl_").unwrap_or(name)
}

//! Variable model shared by the declaration parser and every backend
//! emitter.

/// Base type of a shader-level variable, as declared in the engine's
/// GLSL-flavored source dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VarType {
    Float,
    Vec2,
    Vec3,
    Vec4,
    Mat2,
    Mat3,
    Mat4,
    Sampler2d,
    SamplerCube,
    SamplerExternal,
}

impl VarType {
    /// Resolves a declaration type token against the fixed grammar.
    pub fn parse(token: &str) -> Option<Self> {
        Some(match token {
            "float" => VarType::Float,
            "vec2" => VarType::Vec2,
            "vec3" => VarType::Vec3,
            "vec4" => VarType::Vec4,
            "mat2" => VarType::Mat2,
            "mat3" => VarType::Mat3,
            "mat4" => VarType::Mat4,
            "sampler2D" => VarType::Sampler2d,
            "samplerCube" => VarType::SamplerCube,
            // Both the dialect spelling and the OES-qualified one the
            // ES2 backend rewrites it to.
            "samplerExternal" | "samplerExternalOES" => VarType::SamplerExternal,
            _ => return None,
        })
    }

    /// Number of interpolator registers the type occupies when packed
    /// into a stage-interface struct.
    pub fn register_size(self) -> u32 {
        match self {
            VarType::Mat2 => 2,
            VarType::Mat3 => 3,
            VarType::Mat4 => 4,
            _ => 1,
        }
    }

    pub fn is_sampler(self) -> bool {
        matches!(
            self,
            VarType::Sampler2d | VarType::SamplerCube | VarType::SamplerExternal
        )
    }

    pub fn is_matrix(self) -> bool {
        matches!(self, VarType::Mat2 | VarType::Mat3 | VarType::Mat4)
    }

    /// Spelling in HLSL. Metal shares these for the scalar/vector/matrix
    /// types. Samplers are declared through dedicated texture/sampler
    /// pairs, never spelled inline.
    pub fn hlsl_name(self) -> Option<&'static str> {
        Some(match self {
            VarType::Float => "float",
            VarType::Vec2 => "float2",
            VarType::Vec3 => "float3",
            VarType::Vec4 => "float4",
            VarType::Mat2 => "float2x2",
            VarType::Mat3 => "float3x3",
            VarType::Mat4 => "float4x4",
            VarType::Sampler2d | VarType::SamplerCube | VarType::SamplerExternal => return None,
        })
    }

    pub fn glsl_name(self) -> &'static str {
        match self {
            VarType::Float => "float",
            VarType::Vec2 => "vec2",
            VarType::Vec3 => "vec3",
            VarType::Vec4 => "vec4",
            VarType::Mat2 => "mat2",
            VarType::Mat3 => "mat3",
            VarType::Mat4 => "mat4",
            VarType::Sampler2d => "sampler2D",
            VarType::SamplerCube => "samplerCube",
            VarType::SamplerExternal => "samplerExternal",
        }
    }
}

/// One parsed declaration. `slot` carries the `gl_MultiTexCoordN`
/// index for synthesized attribute entries and is zero otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub name: String,
    pub ty: VarType,
    pub array_size: u32,
    pub slot: u32,
}

impl Variable {
    pub fn new(name: impl Into<String>, ty: VarType, array_size: u32) -> Self {
        Self {
            name: name.into(),
            ty,
            array_size,
            slot: 0,
        }
    }

    pub fn with_slot(name: impl Into<String>, ty: VarType, slot: u32) -> Self {
        Self {
            name: name.into(),
            ty,
            array_size: 1,
            slot,
        }
    }
}

/// Ordered variable table. Names are unique: inserting a variable with
/// an existing name overwrites that entry in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VarTable {
    vars: Vec<Variable>,
}

impl VarTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_unique(&mut self, var: Variable) {
        if let Some(existing) = self.vars.iter_mut().find(|v| v.name == var.name) {
            *existing = var;
        } else {
            self.vars.push(var);
        }
    }

    pub fn extend_unique(&mut self, vars: impl IntoIterator<Item = Variable>) {
        for v in vars {
            self.push_unique(v);
        }
    }

    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.vars.iter().find(|v| v.name == name)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Variable> {
        self.vars.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Variable> {
        self.vars.iter_mut()
    }

    pub fn as_slice(&self) -> &[Variable] {
        &self.vars
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Stable name sort over the whole table, for deterministic buffer
    /// layout emission.
    pub fn sort_by_name(&mut self) {
        self.vars.sort_by(|a, b| a.name.cmp(&b.name));
    }

    /// Stable name sort over `from..`, leaving earlier entries (already
    /// emitted to a separate buffer) in place.
    pub fn sort_range_by_name(&mut self, from: usize) {
        self.vars[from..].sort_by(|a, b| a.name.cmp(&b.name));
    }

    pub fn into_vec(self) -> Vec<Variable> {
        self.vars
    }
}

impl<'a> IntoIterator for &'a VarTable {
    type Item = &'a Variable;
    type IntoIter = std::slice::Iter<'a, Variable>;

    fn into_iter(self) -> Self::IntoIter {
        self.vars.iter()
    }
}

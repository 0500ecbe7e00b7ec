//! CPU-side uniform blocks with named fields
//!
//! A [`UniformLayout`] places fields with WGSL uniform-buffer alignment so the
//! byte block can be copied straight into a buffer the shader reads as a
//! struct. Writes go through typed setters by field name.

use cgmath::Matrix4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformKind {
    Mat4,
    Vec3,
    Float,
    Int,
    /// Stored as a 32-bit 0/1, like a WGSL `u32` flag.
    Bool,
}

impl UniformKind {
    fn align(self) -> usize {
        match self {
            Self::Mat4 | Self::Vec3 => 16,
            Self::Float | Self::Int | Self::Bool => 4,
        }
    }

    fn size(self) -> usize {
        match self {
            Self::Mat4 => 64,
            Self::Vec3 => 12,
            Self::Float | Self::Int | Self::Bool => 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformField {
    pub name: String,
    pub kind: UniformKind,
    pub offset: usize,
}

/// Field placement for one uniform struct, built in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UniformLayout {
    fields: Vec<UniformField>,
    end: usize,
}

impl UniformLayout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: &str, kind: UniformKind) -> Self {
        let offset = self.end.next_multiple_of(kind.align());
        self.fields.push(UniformField {
            name: name.to_string(),
            kind,
            offset,
        });
        self.end = offset + kind.size();
        self
    }

    /// Adds `name[0]` .. `name[count - 1]`. Only 16-byte element kinds keep WGSL array stride.
    pub fn array(self, name: &str, kind: UniformKind, count: usize) -> Self {
        (0..count).fold(self, |layout, i| layout.field(&format!("{name}[{i}]"), kind))
    }

    /// Struct size: the end of the last field rounded up to 16 bytes.
    pub fn size(&self) -> usize {
        self.end.next_multiple_of(16).max(16)
    }

    pub fn get(&self, name: &str) -> Option<&UniformField> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn fields(&self) -> &[UniformField] {
        &self.fields
    }
}

/// Byte block plus the layout that names its fields.
#[derive(Debug, Clone)]
pub struct UniformBlock {
    label: String,
    layout: UniformLayout,
    data: Vec<u8>,
}

impl UniformBlock {
    pub fn new(label: &str, layout: UniformLayout) -> Self {
        let data = vec![0; layout.size()];
        Self {
            label: label.to_string(),
            layout,
            data,
        }
    }

    pub fn set_mat4(&mut self, name: &str, value: Matrix4<f32>) {
        let columns: [[f32; 4]; 4] = value.into();
        self.write(name, UniformKind::Mat4, bytemuck::cast_slice(&columns));
    }

    pub fn set_vec3(&mut self, name: &str, value: [f32; 3]) {
        self.write(name, UniformKind::Vec3, bytemuck::cast_slice(&value));
    }

    pub fn set_float(&mut self, name: &str, value: f32) {
        self.write(name, UniformKind::Float, bytemuck::bytes_of(&value));
    }

    pub fn set_int(&mut self, name: &str, value: i32) {
        self.write(name, UniformKind::Int, bytemuck::bytes_of(&value));
    }

    pub fn set_bool(&mut self, name: &str, value: bool) {
        self.write(name, UniformKind::Bool, bytemuck::bytes_of(&u32::from(value)));
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn layout(&self) -> &UniformLayout {
        &self.layout
    }

    fn write(&mut self, name: &str, kind: UniformKind, bytes: &[u8]) {
        let Some(field) = self.layout.get(name) else {
            log::warn!("Uniform block '{}' has no field '{name}'", self.label);
            return;
        };
        if field.kind != kind {
            log::warn!(
                "Uniform '{name}' in '{}' is {:?}, not {kind:?}",
                self.label,
                field.kind
            );
            return;
        }
        self.data[field.offset..field.offset + bytes.len()].copy_from_slice(bytes);
    }
}

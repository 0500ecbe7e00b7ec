use crate::gfx::resources::gpu_store::GpuStore;

use super::mesh::Mesh;
use super::model::Model;

/// Bind group slot of the per-model transform, shared by both pipelines.
pub const MODEL_GROUP: u32 = 1;
/// Bind group slot of the albedo/normal/metal-roughness set in the lit pipeline.
pub const MATERIAL_GROUP: u32 = 2;
/// Bind group slot of the shadow cube and its comparison sampler in the lit pipeline.
pub const SHADOW_GROUP: u32 = 3;

/// Draw calls for scene content. Pipelines and frame-level groups are bound by the caller.
pub trait DrawModel {
    fn draw_mesh(&mut self, mesh: &Mesh, store: &GpuStore);
    fn draw_mesh_untextured(&mut self, mesh: &Mesh, store: &GpuStore);
    fn draw_model(&mut self, model: &Model, store: &GpuStore, shadow_bind_group: &wgpu::BindGroup);
    fn draw_model_untextured(&mut self, model: &Model, store: &GpuStore);
}

impl DrawModel for wgpu::RenderPass<'_> {
    fn draw_mesh(&mut self, mesh: &Mesh, store: &GpuStore) {
        let Some(material) = store.pbr_binding(mesh.pbr.binding) else {
            return;
        };
        self.set_bind_group(MATERIAL_GROUP, material, &[]);
        self.draw_mesh_untextured(mesh, store);
    }

    fn draw_mesh_untextured(&mut self, mesh: &Mesh, store: &GpuStore) {
        // Skip drawing if the buffers were released
        let Some(buffers) = store.mesh(mesh.buffers) else {
            return;
        };
        self.set_vertex_buffer(0, buffers.vertex_buffer.slice(..));
        self.set_index_buffer(buffers.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        self.draw_indexed(0..buffers.index_count, 0, 0..1);
    }

    fn draw_model(&mut self, model: &Model, store: &GpuStore, shadow_bind_group: &wgpu::BindGroup) {
        let Some(transform) = model.transform_slot.and_then(|slot| store.transform(slot)) else {
            return;
        };
        self.set_bind_group(MODEL_GROUP, transform, &[]);
        self.set_bind_group(SHADOW_GROUP, shadow_bind_group, &[]);
        for mesh in &model.meshes {
            self.draw_mesh(mesh, store);
        }
    }

    fn draw_model_untextured(&mut self, model: &Model, store: &GpuStore) {
        let Some(transform) = model.transform_slot.and_then(|slot| store.transform(slot)) else {
            return;
        };
        self.set_bind_group(MODEL_GROUP, transform, &[]);
        for mesh in &model.meshes {
            self.draw_mesh_untextured(mesh, store);
        }
    }
}

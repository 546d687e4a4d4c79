use wgpu::{BindGroup, BindGroupLayout, ComputePipeline as WgpuComputePipeline, Device};

use crate::config::WORKGROUP_SIZE;
use crate::gpu::buffers::GridBuffers;

/// Compute pipeline running one shader invocation per cell
pub struct ComputePipeline {
    pipeline: WgpuComputePipeline,
    bind_group_layout: BindGroupLayout,
}

impl ComputePipeline {
    /// Create a new compute pipeline
    pub fn new(device: &Device) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("life-compute-shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/life.wgsl").into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("life-bind-group-layout"),
            entries: &[
                // Current generation (read-only snapshot)
                storage_entry(0, true),
                // Next generation (one write per invocation)
                storage_entry(1, false),
                // Grid parameters
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("life-pipeline-layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("life-compute-pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some("main"),
            compilation_options: Default::default(),
            cache: None,
        });

        Self {
            pipeline,
            bind_group_layout,
        }
    }

    /// Create a bind group for a set of step buffers
    pub fn create_bind_group(&self, device: &Device, buffers: &GridBuffers) -> BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("life-bind-group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffers.input.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: buffers.output.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: buffers.params_buffer.as_entire_binding(),
                },
            ],
        })
    }

    /// Dispatch the compute shader over the whole grid
    pub fn dispatch(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        bind_group: &BindGroup,
        grid_width: u32,
        grid_height: u32,
    ) {
        let (workgroups_x, workgroups_y) = workgroup_counts(grid_width, grid_height);

        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("life-compute-pass"),
            timestamp_writes: None,
        });

        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, bind_group, &[]);
        pass.dispatch_workgroups(workgroups_x, workgroups_y, 1);
    }
}

/// Workgroups needed to cover the grid; edge invocations past the grid return early
pub fn workgroup_counts(grid_width: u32, grid_height: u32) -> (u32, u32) {
    (
        grid_width.div_ceil(WORKGROUP_SIZE),
        grid_height.div_ceil(WORKGROUP_SIZE),
    )
}

fn storage_entry(binding: u32, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workgroup_counts_cover_grid() {
        assert_eq!(workgroup_counts(16, 16), (1, 1));
        assert_eq!(workgroup_counts(17, 1), (2, 1));
        assert_eq!(workgroup_counts(80, 23), (5, 2));
    }
}

use std::time::Instant;

use wgpu::BindGroup;

use crate::error::Result;
use crate::gpu::{ComputePipeline, GpuContext, GridBuffers};
use crate::simulation::Grid;

/// GPU execution of a generation: device, pipeline and step buffers.
///
/// Step buffers are sized on the first step and reallocated only if the
/// grid dimensions change.
pub struct GpuSubstrate {
    context: GpuContext,
    pipeline: ComputePipeline,
    buffers: Option<(GridBuffers, BindGroup)>,
}

impl GpuSubstrate {
    pub fn new() -> Result<Self> {
        let context = GpuContext::new()?;
        let pipeline = ComputePipeline::new(&context.device);
        Ok(Self {
            context,
            pipeline,
            buffers: None,
        })
    }

    pub fn adapter_name(&self) -> &str {
        &self.context.adapter_info.name
    }

    /// Upload `current`, run one invocation per cell, read the result into `next`.
    ///
    /// Returns only after the device has finished the step; `next` is left
    /// untouched if the readback fails.
    pub fn step(&mut self, current: &Grid, next: &mut Grid) -> Result<()> {
        let (buffers, bind_group) =
            ensure_buffers(&self.context, &self.pipeline, &mut self.buffers, current)?;
        let start = Instant::now();
        let GpuContext { device, queue, .. } = &self.context;

        buffers.upload(queue, current);

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("life-step-encoder"),
        });
        self.pipeline
            .dispatch(&mut encoder, bind_group, current.width(), current.height());
        buffers.copy_output_to_staging(&mut encoder);
        queue.submit(std::iter::once(encoder.finish()));

        buffers.read_staging(device, next.cells_mut())?;

        log::debug!("gpu step took {:?}", start.elapsed());
        Ok(())
    }
}

fn ensure_buffers<'a>(
    context: &GpuContext,
    pipeline: &ComputePipeline,
    slot: &'a mut Option<(GridBuffers, BindGroup)>,
    grid: &Grid,
) -> Result<&'a (GridBuffers, BindGroup)> {
    let entry = match slot.take() {
        Some(entry) if entry.0.matches(grid) => entry,
        _ => {
            log::debug!("allocating GPU step buffers for {}x{}", grid.width(), grid.height());
            let buffers =
                GridBuffers::new(&context.device, &context.queue, grid.width(), grid.height())?;
            let bind_group = pipeline.create_bind_group(&context.device, &buffers);
            (buffers, bind_group)
        }
    };
    Ok(slot.insert(entry))
}

use std::sync::mpsc;

use wgpu::{Buffer, BufferUsages, Device, Queue};

use crate::error::{LifeError, Result};
use crate::gpu::compute::workgroup_counts;
use crate::simulation::{GpuCell, Grid};

/// Device-side buffers for one generation step.
///
/// `input` receives the host snapshot, the shader writes `output`, and
/// `staging` is the mappable copy the host reads back.
pub struct GridBuffers {
    pub input: Buffer,
    pub output: Buffer,
    pub staging: Buffer,
    /// Uniform buffer for grid parameters
    pub params_buffer: Buffer,
    pub width: u32,
    pub height: u32,
    size: u64,
}

/// Grid parameters passed to the compute shader (16 bytes, aligned to 16)
#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SimParams {
    pub grid_width: u32,
    pub grid_height: u32,
    pub _padding: [u32; 2],
}

/// Render parameters passed to the render shader (16 bytes, aligned to 16)
#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct RenderParams {
    pub grid_width: u32,
    pub grid_height: u32,
    pub _padding: [u32; 2],
}

impl GridBuffers {
    /// Allocate step buffers for a `width` x `height` grid.
    ///
    /// Fails if the grid exceeds the device's storage binding limit or if
    /// the device runs out of memory during allocation.
    pub fn new(device: &Device, queue: &Queue, width: u32, height: u32) -> Result<Self> {
        let limits = device.limits();
        let size = cell_buffer_size(&limits, width, height).map_err(LifeError::ComputeSubstrate)?;
        let (groups_x, groups_y) = workgroup_counts(width, height);
        if groups_x.max(groups_y) > limits.max_compute_workgroups_per_dimension {
            return Err(LifeError::ComputeSubstrate(format!(
                "{}x{} grid needs {}x{} workgroups, device limit is {} per dimension",
                width, height, groups_x, groups_y, limits.max_compute_workgroups_per_dimension
            )));
        }

        device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);

        let input = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("grid-input-buffer"),
            size,
            usage: BufferUsages::STORAGE | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let output = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("grid-output-buffer"),
            size,
            usage: BufferUsages::STORAGE | BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });

        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("grid-staging-buffer"),
            size,
            usage: BufferUsages::COPY_DST | BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let params_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("sim-params-buffer"),
            size: std::mem::size_of::<SimParams>() as u64,
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        if let Some(error) = pop_allocation_scope(device) {
            return Err(LifeError::ComputeSubstrate(format!(
                "grid buffer allocation failed: {error}"
            )));
        }

        let params = SimParams {
            grid_width: width,
            grid_height: height,
            _padding: [0, 0],
        };
        queue.write_buffer(&params_buffer, 0, bytemuck::bytes_of(&params));

        Ok(Self {
            input,
            output,
            staging,
            params_buffer,
            width,
            height,
            size,
        })
    }

    pub fn matches(&self, grid: &Grid) -> bool {
        grid.dimensions() == (self.width, self.height)
    }

    /// Queue the snapshot upload into the input buffer
    pub fn upload(&self, queue: &Queue, grid: &Grid) {
        queue.write_buffer(&self.input, 0, grid.as_bytes());
    }

    /// Queue a copy of the shader output into the staging buffer
    pub fn copy_output_to_staging(&self, encoder: &mut wgpu::CommandEncoder) {
        encoder.copy_buffer_to_buffer(&self.output, 0, &self.staging, 0, self.size);
    }

    /// Block until submitted work finishes, then copy staging into `out`.
    ///
    /// `out` is only written once the map has succeeded.
    pub fn read_staging(&self, device: &Device, out: &mut [GpuCell]) -> Result<()> {
        let slice = self.staging.slice(..);
        let (tx, rx) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        device.poll(wgpu::Maintain::Wait);

        rx.recv()
            .map_err(|_| LifeError::ComputeSubstrate("staging map callback dropped".into()))?
            .map_err(|e| LifeError::ComputeSubstrate(format!("failed to map staging buffer: {e}")))?;

        {
            let data = slice.get_mapped_range();
            out.copy_from_slice(bytemuck::cast_slice(&data[..]));
        }
        self.staging.unmap();
        Ok(())
    }
}

/// Buffers the viewer draws from: a copy of the current grid plus render params
pub struct DisplayBuffers {
    pub cells_buffer: Buffer,
    pub render_params_buffer: Buffer,
    pub width: u32,
    pub height: u32,
}

impl DisplayBuffers {
    /// Allocate display buffers for a `width` x `height` grid, failing if it
    /// exceeds the device's storage binding limit or memory
    pub fn new(device: &Device, queue: &Queue, width: u32, height: u32) -> Result<Self> {
        let limits = device.limits();
        let size = cell_buffer_size(&limits, width, height).map_err(LifeError::Display)?;

        device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);

        let cells_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("display-cells-buffer"),
            size,
            usage: BufferUsages::STORAGE | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let render_params_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("render-params-buffer"),
            size: std::mem::size_of::<RenderParams>() as u64,
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        if let Some(error) = pop_allocation_scope(device) {
            return Err(LifeError::Display(format!(
                "display buffer allocation failed: {error}"
            )));
        }

        let params = RenderParams {
            grid_width: width,
            grid_height: height,
            _padding: [0, 0],
        };
        queue.write_buffer(&render_params_buffer, 0, bytemuck::bytes_of(&params));

        Ok(Self {
            cells_buffer,
            render_params_buffer,
            width,
            height,
        })
    }

    /// Upload the grid to be drawn this frame
    pub fn update_cells(&self, queue: &Queue, grid: &Grid) {
        debug_assert_eq!(grid.dimensions(), (self.width, self.height));
        queue.write_buffer(&self.cells_buffer, 0, grid.as_bytes());
    }
}

/// Bytes of one cell buffer for the grid, checked against the device limits
fn cell_buffer_size(
    limits: &wgpu::Limits,
    width: u32,
    height: u32,
) -> std::result::Result<u64, String> {
    let size = u64::from(width) * u64::from(height) * std::mem::size_of::<GpuCell>() as u64;
    let max = u64::from(limits.max_storage_buffer_binding_size).min(limits.max_buffer_size);
    if size > max {
        return Err(format!(
            "{}x{} grid needs {} bytes, device storage limit is {}",
            width, height, size, max
        ));
    }
    Ok(size)
}

/// Pop the out-of-memory scope pushed before allocating
fn pop_allocation_scope(device: &Device) -> Option<wgpu::Error> {
    pollster::block_on(device.pop_error_scope())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_size() {
        assert_eq!(std::mem::size_of::<SimParams>(), 16);
        assert_eq!(std::mem::size_of::<RenderParams>(), 16);
    }

    #[test]
    fn test_cell_buffer_size_within_limits() {
        let limits = wgpu::Limits::default();
        assert_eq!(cell_buffer_size(&limits, 256, 256), Ok(256 * 256 * 4));
        assert_eq!(cell_buffer_size(&limits, 1, 1), Ok(4));
    }

    #[test]
    fn test_cell_buffer_size_over_binding_limit() {
        let limits = wgpu::Limits::default();
        let err = cell_buffer_size(&limits, 6000, 6000).unwrap_err();
        assert!(err.contains("144000000 bytes"), "{}", err);

        let tight = wgpu::Limits {
            max_storage_buffer_binding_size: 1024,
            ..wgpu::Limits::default()
        };
        assert!(cell_buffer_size(&tight, 16, 16).is_ok());
        assert!(cell_buffer_size(&tight, 17, 16).is_err());
    }
}

use std::sync::Arc;

use vulkano::buffer::{BufferUsage, CpuAccessibleBuffer};
use vulkano::command_buffer::{AutoCommandBufferBuilder, CommandBufferUsage};
use vulkano::descriptor_set::{PersistentDescriptorSet, WriteDescriptorSet};
use vulkano::device::physical::{PhysicalDevice, PhysicalDeviceType};
use vulkano::device::{
	Device, DeviceCreateInfo, DeviceExtensions, Queue, QueueCreateInfo,
};
use vulkano::instance::{Instance, InstanceCreateInfo};
use vulkano::pipeline::{ComputePipeline, Pipeline, PipelineBindPoint};
use vulkano::sync::{self, GpuFuture};

use super::layout::{GpuParticle, GpuSpring, GpuVertex, PassParams};
use super::{ComputeDevice, GpuError, NetBuffers, Readback};

mod cs_spring {
	vulkano_shaders::shader! {
		ty: "compute",
		path: "src/gpu/shader/spring.comp"
	}
}

mod cs_mass {
	vulkano_shaders::shader! {
		ty: "compute",
		path: "src/gpu/shader/mass.comp"
	}
}

const LOCAL_SIZE: u32 = 64;

type StorageBuffer<T> = Arc<CpuAccessibleBuffer<[T]>>;

fn init_err<E: std::fmt::Display>(e: E) -> GpuError {
	GpuError::Init(e.to_string())
}

fn dispatch_err<E: std::fmt::Display>(e: E) -> GpuError {
	GpuError::Dispatch(e.to_string())
}

struct DeviceBuffers {
	vertices: StorageBuffer<GpuVertex>,
	particles: StorageBuffer<GpuParticle>,
	spring_set: Arc<PersistentDescriptorSet>,
	mass_set: Arc<PersistentDescriptorSet>,
}

pub struct VulkanDevice {
	name: String,
	device: Arc<Device>,
	queue: Arc<Queue>,
	spring_pipeline: Arc<ComputePipeline>,
	mass_pipeline: Arc<ComputePipeline>,
	buffers: Option<DeviceBuffers>,
}

impl VulkanDevice {
	pub fn new() -> Result<Self, GpuError> {
		let instance =
			Instance::new(InstanceCreateInfo::default()).map_err(init_err)?;
		let device_extensions = DeviceExtensions::none();
		let (physical_device, queue_family) = PhysicalDevice::enumerate(&instance)
			.filter(|&p| {
				p.supported_extensions().is_superset_of(&device_extensions)
			})
			.filter_map(|p| {
				p.queue_families()
					.find(|&q| q.supports_compute())
					.map(|q| (p, q))
			})
			.min_by_key(|(p, _)| match p.properties().device_type {
				PhysicalDeviceType::DiscreteGpu => 0,
				PhysicalDeviceType::IntegratedGpu => 1,
				PhysicalDeviceType::VirtualGpu => 2,
				PhysicalDeviceType::Cpu => 3,
				PhysicalDeviceType::Other => 4,
			})
			.ok_or_else(|| {
				GpuError::Unavailable("no vulkan device with a compute queue".to_string())
			})?;
		let name = format!(
			"{} ({:?})",
			physical_device.properties().device_name,
			physical_device.properties().device_type,
		);

		let (device, mut queues) = Device::new(
			physical_device,
			DeviceCreateInfo {
				enabled_extensions: physical_device
					.required_extensions()
					.union(&device_extensions),
				queue_create_infos: vec![QueueCreateInfo::family(queue_family)],
				..Default::default()
			},
		)
		.map_err(init_err)?;
		let queue = queues
			.next()
			.ok_or_else(|| GpuError::Init("device returned no queue".to_string()))?;

		let spring_shader = cs_spring::load(device.clone()).map_err(init_err)?;
		let spring_pipeline = ComputePipeline::new(
			device.clone(),
			spring_shader
				.entry_point("main")
				.ok_or_else(|| GpuError::Init("spring shader has no main".to_string()))?,
			&(),
			None,
			|_| {},
		)
		.map_err(init_err)?;
		let mass_shader = cs_mass::load(device.clone()).map_err(init_err)?;
		let mass_pipeline = ComputePipeline::new(
			device.clone(),
			mass_shader
				.entry_point("main")
				.ok_or_else(|| GpuError::Init("mass shader has no main".to_string()))?,
			&(),
			None,
			|_| {},
		)
		.map_err(init_err)?;

		log::info!("vulkan compute device: {}", name);
		Ok(Self {
			name,
			device,
			queue,
			spring_pipeline,
			mass_pipeline,
			buffers: None,
		})
	}

	fn storage<T>(&self, data: Vec<T>) -> Result<StorageBuffer<T>, GpuError>
	where
		T: bytemuck::Pod + Send + Sync,
	{
		CpuAccessibleBuffer::from_iter(
			self.device.clone(),
			BufferUsage::all(),
			false,
			data.into_iter(),
		)
		.map_err(init_err)
	}

	fn descriptor_set(
		pipeline: &Arc<ComputePipeline>,
		writes: Vec<WriteDescriptorSet>,
	) -> Result<Arc<PersistentDescriptorSet>, GpuError> {
		let layout = pipeline
			.layout()
			.set_layouts()
			.get(0)
			.ok_or_else(|| GpuError::Init("pipeline has no descriptor set 0".to_string()))?;
		PersistentDescriptorSet::new(layout.clone(), writes).map_err(init_err)
	}

	// Records and submits one pass, then blocks on its fence.
	fn run_pass(
		&self,
		pipeline: &Arc<ComputePipeline>,
		set: &Arc<PersistentDescriptorSet>,
		params: &PassParams,
		invocations: u32,
	) -> Result<(), GpuError> {
		if invocations == 0 {
			return Ok(());
		}
		let mut builder = AutoCommandBufferBuilder::primary(
			self.device.clone(),
			self.queue.family(),
			CommandBufferUsage::OneTimeSubmit,
		)
		.map_err(dispatch_err)?;
		builder
			.bind_pipeline_compute(pipeline.clone())
			.bind_descriptor_sets(
				PipelineBindPoint::Compute,
				pipeline.layout().clone(),
				0,
				set.clone(),
			)
			.push_constants(pipeline.layout().clone(), 0, *params)
			.dispatch([(invocations + LOCAL_SIZE - 1) / LOCAL_SIZE, 1, 1])
			.map_err(dispatch_err)?;
		let command_buffer = builder.build().map_err(dispatch_err)?;
		sync::now(self.device.clone())
			.then_execute(self.queue.clone(), command_buffer)
			.map_err(dispatch_err)?
			.then_signal_fence_and_flush()
			.map_err(dispatch_err)?
			.wait(None)
			.map_err(dispatch_err)
	}
}

impl ComputeDevice for VulkanDevice {
	fn name(&self) -> String {
		self.name.clone()
	}

	fn upload(&mut self, buffers: NetBuffers) -> Result<(), GpuError> {
		let NetBuffers {
			vertices,
			particles,
			mut springs,
		} = buffers;
		// zero sized buffers cannot be bound; the shader guards on spring_count
		if springs.is_empty() {
			springs.push(GpuSpring::default());
		}
		let vertices = self.storage(vertices)?;
		let particles = self.storage(particles)?;
		let springs = self.storage(springs)?;
		let spring_set = Self::descriptor_set(
			&self.spring_pipeline,
			vec![
				WriteDescriptorSet::buffer(0, vertices.clone()),
				WriteDescriptorSet::buffer(1, particles.clone()),
				WriteDescriptorSet::buffer(2, springs),
			],
		)?;
		let mass_set = Self::descriptor_set(
			&self.mass_pipeline,
			vec![
				WriteDescriptorSet::buffer(0, vertices.clone()),
				WriteDescriptorSet::buffer(1, particles.clone()),
			],
		)?;
		self.buffers = Some(DeviceBuffers {
			vertices,
			particles,
			spring_set,
			mass_set,
		});
		Ok(())
	}

	fn step(&mut self, params: &PassParams) -> Result<(), GpuError> {
		let buffers = self
			.buffers
			.as_ref()
			.ok_or_else(|| GpuError::Dispatch("step before upload".to_string()))?;
		self.run_pass(
			&self.spring_pipeline,
			&buffers.spring_set,
			params,
			params.spring_count,
		)?;
		// the fence wait inside run_pass is the barrier: pass B only starts
		// once every force write of pass A has landed
		self.run_pass(
			&self.mass_pipeline,
			&buffers.mass_set,
			params,
			params.particle_count,
		)
	}

	fn download(&self) -> Result<Readback, GpuError> {
		let buffers = self
			.buffers
			.as_ref()
			.ok_or_else(|| GpuError::Dispatch("download before upload".to_string()))?;
		let vertices = buffers.vertices.read().map_err(dispatch_err)?.to_vec();
		let particles = buffers.particles.read().map_err(dispatch_err)?.to_vec();
		Ok(Readback {
			vertices,
			particles,
		})
	}
}

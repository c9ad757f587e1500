use std::sync::mpsc::{Receiver, Sender};
use std::time::{Duration, Instant};

use crate::config::SimConfig;
use crate::controller_message::ControllerMessage;
use crate::gpu::layout::PassParams;
use crate::gpu::{self, BackendKind, ComputeDevice, NetBuffers};
use crate::integrator::{self, Scheme};
use crate::net::Net;
use crate::time_manager::FrameClock;
use crate::{Error, V3};
use protocol::pr_model::PrModel;
use protocol::user_event::{UpdateInfo, UserEvent};

const FRAME_TIME: Duration = Duration::from_micros(16_667);

enum Backend {
	Host,
	Device {
		device: Box<dyn ComputeDevice>,
		// scheme the device buffers were laid out for
		scheme: Scheme,
		// newest step the host copy has not seen
		last: Option<PassParams>,
	},
}

/// A net plus the stepping parameters and the backend that advances it.
pub struct World {
	config: SimConfig,
	net: Net,
	backend: Backend,
	frame: u64,

	// negative runs freely, zero holds, a positive count is the number of
	// frames still owed before holding again
	forward_frames: i32,
}

impl World {
	/// Builds the configured grid and opens the configured backend. A device
	/// that cannot be opened is logged and the world steps on the host.
	pub fn new(config: SimConfig) -> Result<Self, Error> {
		config.validate()?;
		let net = Net::new_grid(&config.grid)?;
		Self::with_net(config, net)
	}

	/// Like [`World::new`] but drives an already built net, e.g. a rope.
	pub fn with_net(config: SimConfig, net: Net) -> Result<Self, Error> {
		config.validate()?;
		let kind = config.backend;
		let mut world = Self {
			config,
			net,
			backend: Backend::Host,
			frame: 0,
			forward_frames: -1,
		};
		if kind != BackendKind::Host {
			match gpu::open_device(kind) {
				Ok(device) => world.attach(device),
				Err(e) => log::error!("{:?} backend: {}, stepping on host", kind, e),
			}
		}
		Ok(world)
	}

	pub fn with_paused(mut self) -> Self {
		self.forward_frames = 1; // provide first frame
		self
	}

	/// Hands stepping to `device`. If the upload fails the world stays on
	/// the host.
	pub fn attach(&mut self, mut device: Box<dyn ComputeDevice>) {
		self.detach();
		let scheme = self.config.scheme;
		let uploaded = NetBuffers::from_net(&self.net, scheme)
			.and_then(|buffers| device.upload(buffers));
		match uploaded {
			Ok(()) => {
				log::info!(
					"stepping {} particles on {}",
					self.net.particle_count(),
					device.name()
				);
				self.backend = Backend::Device {
					device,
					scheme,
					last: None,
				};
			}
			Err(e) => log::error!("upload to {} failed: {}", device.name(), e),
		}
	}

	/// Returns stepping to the host. The device state is pulled first; if
	/// that fails the host keeps its last synced copy.
	pub fn detach(&mut self) {
		if let Err(e) = self.sync_host() {
			log::error!("download failed, host keeps its last copy: {}", e);
		}
		self.backend = Backend::Host;
	}

	/// Refreshes the host net from the device, if one is active.
	pub fn sync_host(&mut self) -> Result<&Net, Error> {
		if let Backend::Device { device, last, .. } = &mut self.backend {
			if let Some(params) = *last {
				let readback = device.download()?;
				readback.write_back(&mut self.net, &params)?;
				*last = None;
			}
		}
		Ok(&self.net)
	}

	/// Takes effect at the next step; a device is re-laid out on the fly.
	pub fn set_scheme(&mut self, scheme: Scheme) {
		self.config.scheme = scheme;
	}

	/// One sub-step of `dt` with the configured gravity, damping and scheme.
	/// A device failure is logged and the step is redone on the host.
	pub fn step(&mut self, dt: f32) -> Result<(), Error> {
		let gravity = self.config.gravity();
		let damping = self.config.damping;
		let scheme = self.config.scheme;
		integrator::check_step(dt, damping)?;
		if let Backend::Device { .. } = self.backend {
			match self.device_step(dt, gravity, damping, scheme) {
				Ok(()) => return Ok(()),
				Err(e) => {
					log::error!("device step failed, falling back to host: {}", e);
					self.detach();
				}
			}
		}
		self.net.step(dt, gravity, damping, scheme)
	}

	fn device_step(
		&mut self,
		dt: f32,
		gravity: V3,
		damping: f32,
		scheme: Scheme,
	) -> Result<(), Error> {
		if matches!(self.backend, Backend::Device { scheme: s, .. } if s != scheme) {
			self.sync_host()?;
			let buffers = NetBuffers::from_net(&self.net, scheme)?;
			if let Backend::Device {
				device, scheme: s, ..
			} = &mut self.backend
			{
				device.upload(buffers)?;
				*s = scheme;
			}
		}
		let params = gpu::pass_params(&self.net, dt, gravity, damping, scheme);
		if let Backend::Device { device, last, .. } = &mut self.backend {
			*last = Some(params);
			device.step(&params)?;
		}
		Ok(())
	}

	/// Runs the sub-steps the time model asks for after `elapsed` of wall
	/// time and returns how many ran.
	pub fn advance(&mut self, elapsed: Duration) -> Result<u32, Error> {
		let (n, dt) = self.config.time.substeps(elapsed);
		for _ in 0..n {
			self.step(dt)?;
		}
		self.frame += 1;
		Ok(n)
	}

	pub fn pr_model(&mut self) -> Result<PrModel, Error> {
		Ok(self.sync_host()?.pr_model())
	}

	/// Host copy as of the last sync.
	pub fn net(&self) -> &Net {
		&self.net
	}

	pub fn config(&self) -> &SimConfig {
		&self.config
	}

	pub fn frame(&self) -> u64 {
		self.frame
	}

	pub fn is_device_active(&self) -> bool {
		matches!(self.backend, Backend::Device { .. })
	}

	pub fn backend_name(&self) -> String {
		match &self.backend {
			Backend::Host => "host".to_string(),
			Backend::Device { device, .. } => device.name(),
		}
	}

	/// Frame loop for a simulation thread. Ends on `Shutdown` or when the
	/// receiver of `tx` is gone.
	pub fn run_thread(
		&mut self,
		tx: Sender<UserEvent>,
		rx: Receiver<ControllerMessage>,
	) -> Result<(), Error> {
		let mut clock = FrameClock::new(Instant::now());
		let mut first_frame = true;
		loop {
			let start = Instant::now();
			clock.set_paused(self.forward_frames >= 0, start);
			let elapsed = clock.tick(start);
			if self.forward_frames != 0 {
				if self.forward_frames > 0 {
					self.forward_frames -= 1;
				}
				if !first_frame {
					// single frames get one frame of simulated time
					let elapsed = if clock.is_paused() { FRAME_TIME } else { elapsed };
					self.advance(elapsed)?;
				} else {
					first_frame = false;
				}
				let model = self.pr_model()?;
				let info = UpdateInfo {
					load: start.elapsed().as_secs_f32() / FRAME_TIME.as_secs_f32(),
					particle_len: self.net.particle_count(),
					spring_len: self.net.spring_count(),
					frame: self.frame,
				};
				if tx.send(UserEvent::Update(model, info)).is_err() {
					log::info!("world receiver hung up at frame {}", self.frame);
					return Ok(());
				}
			}

			while let Ok(msg) = rx.try_recv() {
				match msg {
					ControllerMessage::TogglePause => {
						if self.forward_frames == 0 {
							self.forward_frames = -1;
						} else {
							self.forward_frames = 0;
						}
					}
					ControllerMessage::FrameForward => {
						if self.forward_frames == 0 {
							self.forward_frames += 1;
						}
					}
					ControllerMessage::Shutdown => {
						log::info!("world shut down at frame {}", self.frame);
						return Ok(());
					}
				}
			}
			let spent = start.elapsed();
			if spent < FRAME_TIME {
				std::thread::sleep(FRAME_TIME - spent);
			}
		}
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::config::{GridSpec, Placement, Stiffness};
	use crate::gpu::layout::PassParams;
	use crate::gpu::{GpuError, Readback};
	use crate::time_manager::TimeModel;
	use approx::assert_relative_eq;
	use std::sync::mpsc;

	fn config(backend: BackendKind, scheme: Scheme) -> SimConfig {
		SimConfig {
			grid: GridSpec::new(V3::zeros(), V3::new(4., 4., 0.), 4, 4)
				.with_placement(Placement::Planar)
				.with_stiffness(Stiffness::new(50., 5., 1.))
				.with_corner_pins(),
			gravity: [0., -10., 0.],
			scheme,
			backend,
			time: TimeModel::FixedSteps(25),
			..Default::default()
		}
	}

	fn assert_same_positions(a: &Net, b: &Net) {
		for (pa, pb) in a.positions().zip(b.positions()) {
			assert_relative_eq!(pa, pb, epsilon = 1e-3);
		}
	}

	struct BrokenDevice;

	impl ComputeDevice for BrokenDevice {
		fn name(&self) -> String {
			"broken".to_string()
		}

		fn upload(&mut self, _buffers: NetBuffers) -> Result<(), GpuError> {
			Ok(())
		}

		fn step(&mut self, _params: &PassParams) -> Result<(), GpuError> {
			Err(GpuError::Dispatch("device lost".to_string()))
		}

		fn download(&self) -> Result<Readback, GpuError> {
			Err(GpuError::Dispatch("device lost".to_string()))
		}
	}

	#[test]
	fn test_host_advance() {
		let mut world = World::new(config(BackendKind::Host, Scheme::Euler)).unwrap();
		assert!(!world.is_device_active());
		assert_eq!(world.backend_name(), "host");
		let before: Vec<V3> = world.net().positions().collect();
		assert_eq!(world.advance(Duration::from_millis(16)).unwrap(), 25);
		assert_eq!(world.frame(), 1);
		let after: Vec<V3> = world.net().positions().collect();
		assert_ne!(before, after);
	}

	#[test]
	fn test_parallel_matches_host() {
		for scheme in [Scheme::Euler, Scheme::Verlet] {
			let mut host = World::new(config(BackendKind::Host, scheme)).unwrap();
			let mut device = World::new(config(BackendKind::Parallel, scheme)).unwrap();
			assert!(device.is_device_active());
			for _ in 0..2 {
				host.advance(Duration::ZERO).unwrap();
				device.advance(Duration::ZERO).unwrap();
			}
			let synced = device.sync_host().unwrap().clone();
			assert_same_positions(host.net(), &synced);
			let model = device.pr_model().unwrap();
			assert_eq!(model.vertex_len(), synced.particle_count());
		}
	}

	#[test]
	fn test_scheme_switch_on_device() {
		let mut host = World::new(config(BackendKind::Host, Scheme::Euler)).unwrap();
		let mut device = World::new(config(BackendKind::Parallel, Scheme::Euler)).unwrap();
		for world in [&mut host, &mut device] {
			world.advance(Duration::ZERO).unwrap();
			world.set_scheme(Scheme::Verlet);
			world.advance(Duration::ZERO).unwrap();
		}
		assert!(device.is_device_active());
		device.sync_host().unwrap();
		assert_same_positions(host.net(), device.net());
		for world in [&mut host, &mut device] {
			world.set_scheme(Scheme::Euler);
			world.advance(Duration::ZERO).unwrap();
		}
		device.sync_host().unwrap();
		assert_same_positions(host.net(), device.net());
		for (a, b) in host.net().particles().iter().zip(device.net().particles()) {
			assert_relative_eq!(a.ppos, b.ppos, epsilon = 1e-3);
			assert_relative_eq!(a.vel, b.vel, epsilon = 1e-2);
		}
	}

	#[cfg(not(feature = "vulkan"))]
	#[test]
	fn test_missing_backend_falls_back() {
		let mut world = World::new(config(BackendKind::Vulkan, Scheme::Euler)).unwrap();
		assert!(!world.is_device_active());
		assert_eq!(world.advance(Duration::ZERO).unwrap(), 25);
	}

	#[test]
	fn test_device_failure_falls_back() {
		let mut host = World::new(config(BackendKind::Host, Scheme::Euler)).unwrap();
		let mut world = World::new(config(BackendKind::Host, Scheme::Euler)).unwrap();
		world.attach(Box::new(BrokenDevice));
		assert!(world.is_device_active());
		world.step(0.01).unwrap();
		host.step(0.01).unwrap();
		assert!(!world.is_device_active());
		assert_eq!(
			world.net().positions().collect::<Vec<_>>(),
			host.net().positions().collect::<Vec<_>>()
		);
	}

	#[test]
	fn test_rejects_bad_dt() {
		let mut world = World::new(config(BackendKind::Parallel, Scheme::Euler)).unwrap();
		assert!(matches!(world.step(0.), Err(Error::InvalidTimeStep(_))));
		assert!(world.is_device_active());
	}

	#[test]
	fn test_invalid_config() {
		let mut config = config(BackendKind::Host, Scheme::Euler);
		config.damping = 2.;
		assert!(World::new(config).is_err());
	}

	#[test]
	fn test_run_thread_frame_forward() {
		let world = World::new(config(BackendKind::Host, Scheme::Euler))
			.unwrap()
			.with_paused();
		let (tx, model_rx) = mpsc::channel();
		let (ctl_tx, rx) = mpsc::channel();
		let handle = std::thread::spawn(move || {
			let mut world = world;
			world.run_thread(tx, rx)
		});
		let UserEvent::Update(model, info) = model_rx.recv().unwrap();
		assert_eq!(info.frame, 0);
		assert_eq!(info.particle_len, 25);
		assert_eq!(model.vertex_len(), 25);
		ctl_tx.send(ControllerMessage::FrameForward).unwrap();
		let UserEvent::Update(_, info) = model_rx.recv().unwrap();
		assert_eq!(info.frame, 1);
		ctl_tx.send(ControllerMessage::Shutdown).unwrap();
		assert!(handle.join().unwrap().is_ok());
	}

	#[test]
	fn test_run_thread_stops_without_receiver() {
		let world = World::new(config(BackendKind::Host, Scheme::Euler)).unwrap();
		let (tx, model_rx) = mpsc::channel();
		let (_ctl_tx, rx) = mpsc::channel();
		let handle = std::thread::spawn(move || {
			let mut world = world;
			world.run_thread(tx, rx)
		});
		assert!(model_rx.recv().is_ok());
		drop(model_rx);
		assert!(handle.join().unwrap().is_ok());
	}
}

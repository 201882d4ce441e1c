use std::time::Duration;

/// Default `User-Agent` sent on every RTSP request
pub const DEFAULT_USER_AGENT: &str = "AirPlay/377.40.00";

/// What a full capture queue does with a new frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackpressurePolicy {
    /// Evict the oldest queued frame; the producer never waits
    #[default]
    DropOldest,
    /// Producer waits until the consumer frees a slot
    Block,
}

/// Configuration for a RAOP streaming session
#[derive(Debug, Clone)]
pub struct RaopConfig {
    /// `User-Agent` header value (default: `AirPlay/377.40.00`)
    pub user_agent: String,

    /// Timeout for the TCP connect to the receiver (default: 5 seconds)
    pub connect_timeout: Duration,

    /// Timeout for a single RTSP round trip (default: 10 seconds, `None` = wait forever)
    pub request_timeout: Option<Duration>,

    /// Receiver-side latency in samples, advertised in SDP and sync packets (default: 11025)
    pub latency_samples: u32,

    /// Send a sync packet every N audio frames (default: 125)
    pub sync_every_frames: u32,

    /// Additionally send sync packets on a wall-clock interval (default: disabled)
    pub sync_interval: Option<Duration>,

    /// Volume applied right after RECORD, in [0, 1] (default: 0.66)
    pub initial_volume: Option<f32>,

    /// Local control port (0 = ephemeral)
    pub control_port: u16,

    /// Local timing port (0 = ephemeral)
    pub timing_port: u16,

    /// Local audio port (0 = ephemeral)
    pub audio_port: u16,

    /// Silent frames sent between SETUP and RECORD to prime the receiver (default: 0)
    pub pre_record_silence_frames: u32,

    /// Silent frames sent after the initial volume request (default: 0)
    pub post_record_silence_frames: u32,

    /// Static PIN used when the receiver demands pairing
    pub pin: Option<String>,

    /// Run the X25519 `/auth-setup` exchange before ANNOUNCE (default: true)
    pub auth_setup: bool,

    /// Capacity of the capture queue in frames (default: 64)
    pub capture_queue_capacity: usize,

    /// Capture queue behavior when full (default: drop oldest)
    pub backpressure: BackpressurePolicy,
}

impl Default for RaopConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            connect_timeout: Duration::from_secs(5),
            request_timeout: Some(Duration::from_secs(10)),
            latency_samples: 11025,
            sync_every_frames: 125,
            sync_interval: None,
            initial_volume: Some(0.66),
            control_port: 0,
            timing_port: 0,
            audio_port: 0,
            pre_record_silence_frames: 0,
            post_record_silence_frames: 0,
            pin: None,
            auth_setup: true,
            capture_queue_capacity: 64,
            backpressure: BackpressurePolicy::DropOldest,
        }
    }
}

impl RaopConfig {
    /// Create a new config builder
    #[must_use]
    pub fn builder() -> RaopConfigBuilder {
        RaopConfigBuilder::default()
    }
}

/// Builder for `RaopConfig`
#[derive(Debug, Clone, Default)]
pub struct RaopConfigBuilder {
    config: RaopConfig,
}

impl RaopConfigBuilder {
    /// Set the `User-Agent` header
    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Set TCP connect timeout
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Set per-request timeout (`None` disables it)
    #[must_use]
    pub fn request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Set receiver latency in samples
    #[must_use]
    pub fn latency_samples(mut self, samples: u32) -> Self {
        self.config.latency_samples = samples;
        self
    }

    /// Set how many frames pass between sync packets
    #[must_use]
    pub fn sync_every_frames(mut self, frames: u32) -> Self {
        self.config.sync_every_frames = frames.max(1);
        self
    }

    /// Enable a wall-clock sync interval
    #[must_use]
    pub fn sync_interval(mut self, interval: Duration) -> Self {
        self.config.sync_interval = Some(interval);
        self
    }

    /// Set (or clear) the volume sent after RECORD
    #[must_use]
    pub fn initial_volume(mut self, volume: Option<f32>) -> Self {
        self.config.initial_volume = volume;
        self
    }

    /// Bind fixed local UDP ports instead of ephemeral ones
    #[must_use]
    pub fn local_ports(mut self, control: u16, timing: u16, audio: u16) -> Self {
        self.config.control_port = control;
        self.config.timing_port = timing;
        self.config.audio_port = audio;
        self
    }

    /// Set silence priming frame counts
    #[must_use]
    pub fn silence_frames(mut self, pre_record: u32, post_record: u32) -> Self {
        self.config.pre_record_silence_frames = pre_record;
        self.config.post_record_silence_frames = post_record;
        self
    }

    /// Set PIN for pairing
    #[must_use]
    pub fn pin(mut self, pin: impl Into<String>) -> Self {
        self.config.pin = Some(pin.into());
        self
    }

    /// Enable or skip the `/auth-setup` exchange
    #[must_use]
    pub fn auth_setup(mut self, enable: bool) -> Self {
        self.config.auth_setup = enable;
        self
    }

    /// Set capture queue capacity and backpressure policy
    #[must_use]
    pub fn capture_queue(mut self, capacity: usize, policy: BackpressurePolicy) -> Self {
        self.config.capture_queue_capacity = capacity.max(1);
        self.config.backpressure = policy;
        self
    }

    /// Build the configuration
    #[must_use]
    pub fn build(self) -> RaopConfig {
        self.config
    }
}

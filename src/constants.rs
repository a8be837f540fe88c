/// 图像解码失败或像素不可读时使用的固定种子
pub const FALLBACK_SEED: u32 = 12345;

/// 画布最大宽度（像素），上传图像按比例缩小到此范围内
pub const CANVAS_MAX_WIDTH: u32 = 600;

/// 画布最大高度（像素）
pub const CANVAS_MAX_HEIGHT: u32 = 450;

/// 种子采样区域边长上限
pub const SEED_REGION_EDGE: u32 = 200;

/// 实际参与哈希的子块边长上限
pub const SEED_HASH_EDGE: u32 = 100;

/// 默认展示准确率（百分比）
pub const DEFAULT_DISPLAY_ACCURACY: u8 = 90;

/// EEG 环形缓冲区容量
pub const EEG_BUFFER_LEN: usize = 100;

/// HRV 环形缓冲区容量
pub const HRV_BUFFER_LEN: usize = 50;

/// 新预测到达后预生成的 EEG 样本数
pub const WARMUP_EEG_SAMPLES: usize = 50;

/// 睡姿重新采样的最短间隔（毫秒）
pub const POSITION_MIN_INTERVAL_MS: i64 = 15_000;

/// 呼吸模式重新采样的最短间隔（毫秒）
pub const RESPIRATORY_MIN_INTERVAL_MS: i64 = 12_000;

/// 每个 tick 尝试重新采样睡姿/呼吸模式的概率
pub const RESAMPLE_CHANCE: f64 = 0.1;

/// 每秒毫秒数
pub const MILLIS_PER_SEC: f64 = 1_000.0;

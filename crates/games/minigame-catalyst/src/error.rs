/// Invalid tuning values caught when actors are built.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("Body half-extents must be positive, got ({x}, {y})")]
    NonPositiveExtents { x: f32, y: f32 },
    #[error("Skin width {skin} must be positive and smaller than the body half-extents")]
    InvalidSkinWidth { skin: f32 },
    #[error("Time to jump apex must be positive, got {0}")]
    InvalidApexTime(f32),
    #[error("Flask capacity must be at least 1")]
    EmptyFlask,
}

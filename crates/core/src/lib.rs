pub mod campaign;
pub mod config;
pub mod domain;
pub mod errors;
pub mod features;
pub mod prediction;
pub mod recommendation;
pub mod segmentation;

pub use campaign::{
    CampaignKind, CampaignLedger, CampaignPlanner, CampaignReport, CampaignSelector,
    CampaignStats, DiscountBatch, LedgerEntry, PlannedEmail,
};
pub use config::{AppConfig, ConfigError, ConfigOverrides, LogFormat};
pub use domain::{CampaignBucket, CustomerId, CustomerProfile, ItemId, RawTransaction, Season};
pub use errors::PipelineError;
pub use features::{DataSummary, EngineeredRecord, FeatureEngineer};
pub use prediction::{
    BehaviorPredictor, CustomerForecast, PredictionReport, PredictionResult, TrainingReport,
};
pub use recommendation::{ItemAffinity, RecommendationEngine, RecommendationSet};
pub use segmentation::{RfmRecord, Segment, SegmentationEngine};

mod driver_lifecycle;
mod jog_pipeline;
mod properties;
mod scenarios;

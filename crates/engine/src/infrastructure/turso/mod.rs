//! Turso (libSQL over HTTP) adapter.

mod client;
mod exchange_repo;
pub mod helpers;
mod wire;

pub use client::{pipeline_url, TursoClient, TursoSettings, USER_AGENT};
pub use exchange_repo::TursoExchangeRepo;
pub use wire::{
    Cell, Column, ExecuteResult, PipelineRequest, PipelineResponse, StepError, StepResponse,
    StepResult,
};

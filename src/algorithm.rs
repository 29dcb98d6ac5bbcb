// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Every operation in this crate runs through the same lifecycle: a
//! configuration check, then preprocessing, processing and postprocessing.
//! The first stage to fail stops the run, and its status is recorded as the
//! exit status. A run that goes through all four stages is completed, even
//! when processing reports a non-success status (e.g. an edge that was
//! rejected as illegal to collapse).

use anyhow::Context;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AlgorithmState {
    Ready,
    Running,
    /// The configuration check failed.
    NotConfigured,
    PreprocessingFailed,
    ProcessingFailed,
    PostprocessingFailed,
    Completed,
}

impl AlgorithmState {
    pub fn is_failed(self) -> bool {
        matches!(
            self,
            AlgorithmState::NotConfigured
                | AlgorithmState::PreprocessingFailed
                | AlgorithmState::ProcessingFailed
                | AlgorithmState::PostprocessingFailed
        )
    }
}

/// An algorithm specific status enum. The default value is success, with
/// code 0.
pub trait ExitStatus:
    Copy + Default + PartialEq + std::error::Error + Send + Sync + 'static
{
    fn code(&self) -> u32;

    fn is_success(&self) -> bool {
        self.code() == 0
    }
}

/// Implements `Display` and `Error` for status enums.
#[macro_export]
macro_rules! impl_status_error {
    ($status:ty) => {
        impl std::fmt::Display for $status {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_fmt(format_args!("{self:?}"))
            }
        }
        impl std::error::Error for $status {}
    };
}

/// The four stages of an algorithm. `Err` stops the run. The processing
/// stage may also finish with `Ok` and a non-success status, which counts as
/// a completed run.
pub trait AlgorithmStages {
    type ExitStatus: ExitStatus;

    const NAME: &'static str;

    fn config_check(&mut self) -> Result<(), Self::ExitStatus>;
    fn preprocessing(&mut self) -> Result<(), Self::ExitStatus>;
    fn processing(&mut self) -> Result<Self::ExitStatus, Self::ExitStatus>;
    fn postprocessing(&mut self) -> Result<(), Self::ExitStatus>;
}

/// Drives a set of [`AlgorithmStages`] and records the outcome.
pub struct Algorithm<S: AlgorithmStages> {
    stages: S,
    state: AlgorithmState,
    exit_status: S::ExitStatus,
}

impl<S: AlgorithmStages> Algorithm<S> {
    pub fn new(stages: S) -> Self {
        Self {
            stages,
            state: AlgorithmState::Ready,
            exit_status: S::ExitStatus::default(),
        }
    }

    /// Runs the stages in order and returns the numeric exit code. Only the
    /// first call does any work; later calls return the recorded code.
    pub fn run(&mut self) -> u32 {
        if self.state != AlgorithmState::Ready {
            log::debug!("{} has already run, returning its recorded status", S::NAME);
            return self.exit_code();
        }
        self.state = AlgorithmState::Running;

        let outcome = self
            .stages
            .config_check()
            .map_err(|err| (AlgorithmState::NotConfigured, err))
            .and_then(|()| {
                self.stages
                    .preprocessing()
                    .map_err(|err| (AlgorithmState::PreprocessingFailed, err))
            })
            .and_then(|()| {
                self.stages
                    .processing()
                    .map_err(|err| (AlgorithmState::ProcessingFailed, err))
            })
            .and_then(|status| {
                self.stages
                    .postprocessing()
                    .map(|()| status)
                    .map_err(|err| (AlgorithmState::PostprocessingFailed, err))
            });

        match outcome {
            Ok(status) => {
                self.state = AlgorithmState::Completed;
                self.exit_status = status;
                if !status.is_success() {
                    log::debug!("{} completed with status {status}", S::NAME);
                }
            }
            Err((state, status)) => {
                self.state = state;
                self.exit_status = status;
                log::warn!("{} stopped in state {state:?} with status {status}", S::NAME);
            }
        }
        self.exit_code()
    }

    pub fn state(&self) -> AlgorithmState {
        self.state
    }

    pub fn is_completed(&self) -> bool {
        self.state == AlgorithmState::Completed
    }

    pub fn is_failed(&self) -> bool {
        self.state.is_failed()
    }

    pub fn exit_status(&self) -> S::ExitStatus {
        self.exit_status
    }

    pub fn exit_code(&self) -> u32 {
        self.exit_status.code()
    }

    pub fn stages(&self) -> &S {
        &self.stages
    }

    pub fn into_inner(self) -> S {
        self.stages
    }

    /// Completed and successful as an `anyhow` result, so callers can use
    /// `?`.
    pub fn into_result(self) -> anyhow::Result<S> {
        if self.is_completed() && self.exit_status.is_success() {
            Ok(self.stages)
        } else {
            Err(anyhow::Error::new(self.exit_status))
                .context(format!("{} ended in state {:?}", S::NAME, self.state))
        }
    }
}

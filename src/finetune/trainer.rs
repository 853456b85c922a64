use std::path::PathBuf;
use std::time::Instant;

use candle_core::Var;
use candle_core::backprop::GradStore;
use candle_nn::{AdamW, Optimizer, ParamsAdamW};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::{debug, info};

use crate::constants::BEST_PAIR_MODEL_FILENAME;
use crate::training::bce_with_logits_sum;

use super::batch::{LmBatch, PairEncoder, PairExample};
use super::classifier::PairClassifier;
use super::config::FinetuneConfig;
use super::error::FinetuneError;
use super::metrics::BinaryReport;

/// Validation loss (per example) and classification report.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairEvaluation {
    pub avg_loss: f64,
    pub report: BinaryReport,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FinetuneEvent {
    /// Training predictions since the previous report.
    TrainReport {
        epoch: usize,
        batch: usize,
        report: BinaryReport,
    },
    Validation {
        epoch: usize,
        batch: usize,
        evaluation: PairEvaluation,
    },
    BestSaved { path: PathBuf, f1: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FinetuneSummary {
    pub nb_batches: usize,
    pub nb_evaluations: usize,
    /// Best validation F1; 0 when no validation beat the initial 0.
    pub best_f1: f64,
    pub best_path: Option<PathBuf>,
}

/// Rescales all gradients so their global L2 norm is at most `max_norm`.
///
/// Returns the norm before clipping.
pub fn clip_grad_norm(
    grads: &mut GradStore,
    vars: &[Var],
    max_norm: f64,
) -> Result<f64, FinetuneError> {
    let mut squared = 0.0f64;
    for var in vars {
        if let Some(grad) = grads.get(var.as_tensor()) {
            squared += grad.sqr()?.sum_all()?.to_scalar::<f32>()? as f64;
        }
    }
    let total = squared.sqrt();

    if total > max_norm && total > 0.0 {
        let scale = max_norm / total;
        for var in vars {
            if let Some(grad) = grads.remove(var.as_tensor()) {
                grads.insert(var.as_tensor(), grad.affine(scale, 0.0)?);
            }
        }
    }
    Ok(total)
}

/// Fine-tunes a [`PairClassifier`] on next-segment pairs.
pub struct PairTrainer {
    model: PairClassifier,
    config: FinetuneConfig,
    optimizer: AdamW,
    vars: Vec<Var>,
    rng: StdRng,
}

impl PairTrainer {
    pub fn new(model: PairClassifier, config: FinetuneConfig) -> Result<Self, FinetuneError> {
        config.validate()?;
        let vars = model.vars();
        let optimizer = AdamW::new(
            vars.clone(),
            ParamsAdamW {
                lr: config.lr,
                ..Default::default()
            },
        )?;

        Ok(Self {
            rng: StdRng::seed_from_u64(config.seed),
            model,
            config,
            optimizer,
            vars,
        })
    }

    pub fn model(&self) -> &PairClassifier {
        &self.model
    }

    pub fn into_model(self) -> PairClassifier {
        self.model
    }

    /// Summed loss and predictions of one batch, without updating the model.
    fn score_batch(&self, batch: &LmBatch) -> Result<(f64, Vec<bool>), FinetuneError> {
        let logits = self.model.forward(batch)?;
        let loss = bce_with_logits_sum(&logits, &batch.labels)?;
        Ok((loss.to_scalar::<f32>()? as f64, predictions(&logits)?))
    }

    /// Loss per example and report over `examples`.
    pub fn evaluate(
        &self,
        examples: &[PairExample],
        encoder: &PairEncoder,
    ) -> Result<PairEvaluation, FinetuneError> {
        if examples.is_empty() {
            return Err(FinetuneError::EmptyDataset { what: "validation" });
        }

        let mut total_loss = 0.0;
        let mut report = BinaryReport::default();
        for chunk in examples.chunks(self.config.batch_size) {
            let batch = encoder.encode(chunk, self.model.device())?;
            let (loss, predicted) = self.score_batch(&batch)?;
            total_loss += loss;
            report.extend(&predicted, &labels_of(chunk));
        }

        let evaluation = PairEvaluation {
            avg_loss: total_loss / examples.len() as f64,
            report,
        };
        info!(
            avg_loss = evaluation.avg_loss,
            f1 = report.f1(),
            accuracy = report.accuracy(),
            "Pair validation finished"
        );
        Ok(evaluation)
    }

    /// One AdamW update on `batch` with gradient clipping; returns loss and predictions.
    pub fn train_batch(&mut self, batch: &LmBatch) -> Result<(f64, Vec<bool>), FinetuneError> {
        let logits = self.model.forward(batch)?;
        let loss = bce_with_logits_sum(&logits, &batch.labels)?;

        let mut grads = loss.backward()?;
        let grad_norm = clip_grad_norm(&mut grads, &self.vars, self.config.max_grad_norm)?;
        self.optimizer.step(&grads)?;
        debug!(grad_norm, "Pair classifier step");

        Ok((loss.to_scalar::<f32>()? as f64, predictions(&logits)?))
    }

    pub fn train(
        &mut self,
        train: &[PairExample],
        val: &[PairExample],
        encoder: &PairEncoder,
    ) -> Result<FinetuneSummary, FinetuneError> {
        self.train_with(train, val, encoder, |_| {})
    }

    /// Trains for the configured epochs, validating every `eval_every` batches
    /// and saving the model whenever validation F1 strictly improves.
    pub fn train_with<F>(
        &mut self,
        train: &[PairExample],
        val: &[PairExample],
        encoder: &PairEncoder,
        mut on_event: F,
    ) -> Result<FinetuneSummary, FinetuneError>
    where
        F: FnMut(&FinetuneEvent),
    {
        if train.is_empty() {
            return Err(FinetuneError::EmptyDataset { what: "training" });
        }
        if val.is_empty() {
            return Err(FinetuneError::EmptyDataset { what: "validation" });
        }

        let best_path = self
            .config
            .save_dir
            .as_ref()
            .map(|dir| dir.join(BEST_PAIR_MODEL_FILENAME));
        if let Some(dir) = &self.config.save_dir {
            std::fs::create_dir_all(dir).map_err(|source| FinetuneError::Io {
                path: dir.clone(),
                source,
            })?;
        }

        let mut summary = FinetuneSummary {
            nb_batches: 0,
            nb_evaluations: 0,
            best_f1: 0.0,
            best_path: None,
        };

        for epoch in 1..=self.config.epochs {
            let started = Instant::now();
            let mut order: Vec<usize> = (0..train.len()).collect();
            order.shuffle(&mut self.rng);

            let mut window = BinaryReport::default();
            for (batch_index, indices) in order.chunks(self.config.batch_size).enumerate() {
                let examples: Vec<PairExample> =
                    indices.iter().map(|&i| train[i].clone()).collect();
                let batch = encoder.encode(&examples, self.model.device())?;
                let (_, predicted) = self.train_batch(&batch)?;
                window.extend(&predicted, &labels_of(&examples));
                summary.nb_batches += 1;

                if (batch_index + 1) % self.config.eval_every != 0 {
                    continue;
                }

                on_event(&FinetuneEvent::TrainReport {
                    epoch,
                    batch: batch_index + 1,
                    report: window,
                });
                window = BinaryReport::default();

                let evaluation = self.evaluate(val, encoder)?;
                summary.nb_evaluations += 1;
                on_event(&FinetuneEvent::Validation {
                    epoch,
                    batch: batch_index + 1,
                    evaluation,
                });

                let f1 = evaluation.report.f1();
                if f1 > summary.best_f1 {
                    summary.best_f1 = f1;
                    if let Some(path) = &best_path {
                        self.model.save(path)?;
                        info!(f1, path = %path.display(), "Found new best model");
                        summary.best_path = Some(path.clone());
                        on_event(&FinetuneEvent::BestSaved {
                            path: path.clone(),
                            f1,
                        });
                    }
                }
            }

            info!(
                epoch,
                elapsed_s = started.elapsed().as_secs_f64(),
                "Pair fine-tuning epoch finished"
            );
        }

        Ok(summary)
    }
}

fn predictions(logits: &candle_core::Tensor) -> Result<Vec<bool>, FinetuneError> {
    // sigmoid(x) > 0.5 exactly when x > 0
    Ok(logits
        .to_vec1::<f32>()?
        .into_iter()
        .map(|logit| logit > 0.0)
        .collect())
}

fn labels_of(examples: &[PairExample]) -> Vec<bool> {
    examples.iter().map(|e| e.label).collect()
}

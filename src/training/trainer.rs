use std::path::PathBuf;
use std::time::Instant;

use candle_core::Tensor;
use candle_core::backprop::GradStore;
use candle_nn::{AdamW, Optimizer, ParamsAdamW, SGD};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::{debug, info};

use crate::graph::{GraphError, PageGraph};
use crate::model::{EdgeAffinityModel, PageTensors};

use super::accumulator::{RunningStats, WindowReport};
use super::checkpoint::{BestTracker, epoch_checkpoint_path, prepare_checkpoint_dir, save_best};
use super::config::{GraphTrainConfig, OptimizerKind};
use super::error::TrainingError;
use super::loss::{per_edge_accuracy, per_edge_loss};

/// Averages of one validation pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidationReport {
    /// Pages that contributed (pages without edges are skipped).
    pub nb_pages: usize,
    pub avg_loss: f64,
    pub avg_accuracy: f64,
}

impl ValidationReport {
    pub fn loss_line(&self) -> String {
        format!("Val loss: {:.1}", self.avg_loss)
    }

    pub fn accuracy_line(&self) -> String {
        format!("Accuracy: {:.3}", self.avg_accuracy)
    }
}

/// Progress notifications emitted while training.
#[derive(Debug, Clone, PartialEq)]
pub enum TrainingEvent {
    /// A validation pass; `epoch` is `None` for the pass before training.
    Validation {
        epoch: Option<usize>,
        report: ValidationReport,
    },
    /// A windowed training report.
    Window { epoch: usize, report: WindowReport },
    BestSaved {
        epoch: usize,
        path: PathBuf,
        accuracy: f64,
    },
    CheckpointSaved { epoch: usize, path: PathBuf },
}

/// What a training run achieved.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSummary {
    pub initial: ValidationReport,
    /// One validation report per finished epoch.
    pub history: Vec<ValidationReport>,
    pub best_accuracy: Option<f64>,
    /// 1-based epoch of the best validation accuracy.
    pub best_epoch: Option<usize>,
}

/// Result of one optimizer update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepOutcome {
    /// Summed loss of the pages that went into the update, before the update.
    pub loss: f64,
    /// Sum of the per-parameter gradient norms.
    pub grad_norm: f64,
}

enum GraphOptimizer {
    Adam(AdamW),
    Sgd(SGD),
}

impl GraphOptimizer {
    fn new(
        kind: OptimizerKind,
        vars: Vec<candle_core::Var>,
        lr: f64,
    ) -> candle_core::Result<Self> {
        match kind {
            OptimizerKind::Adam => {
                let params = ParamsAdamW {
                    lr,
                    weight_decay: 0.0,
                    ..Default::default()
                };
                Ok(Self::Adam(AdamW::new(vars, params)?))
            }
            OptimizerKind::Sgd => Ok(Self::Sgd(SGD::new(vars, lr)?)),
        }
    }

    fn step(&mut self, grads: &GradStore) -> candle_core::Result<()> {
        match self {
            Self::Adam(optimizer) => optimizer.step(grads),
            Self::Sgd(optimizer) => optimizer.step(grads),
        }
    }
}

/// Trains an [`EdgeAffinityModel`] one page graph at a time.
///
/// The trainer owns the model for the duration of the run; nothing else mutates
/// its weights. Page tensors are created on the model's device right before each
/// forward pass and dropped after it.
pub struct GraphTrainer {
    model: EdgeAffinityModel,
    config: GraphTrainConfig,
    optimizer: GraphOptimizer,
    vars: Vec<candle_core::Var>,
    rng: StdRng,
}

impl GraphTrainer {
    pub fn new(model: EdgeAffinityModel, config: GraphTrainConfig) -> Result<Self, TrainingError> {
        config.validate()?;
        if let Some(dir) = &config.checkpoint_dir {
            prepare_checkpoint_dir(dir)?;
        }

        let vars = model.vars();
        let optimizer = GraphOptimizer::new(config.optimizer, vars.clone(), config.lr)?;
        debug!(
            optimizer = %config.optimizer,
            lr = config.lr,
            nb_vars = vars.len(),
            "Graph trainer created"
        );

        Ok(Self {
            rng: StdRng::seed_from_u64(config.seed),
            model,
            config,
            optimizer,
            vars,
        })
    }

    pub fn model(&self) -> &EdgeAffinityModel {
        &self.model
    }

    pub fn into_model(self) -> EdgeAffinityModel {
        self.model
    }

    pub fn config(&self) -> &GraphTrainConfig {
        &self.config
    }

    /// Loss and edge scores of one labeled page; `None` when it has no edges.
    fn forward_page(
        &self,
        page: &PageGraph,
        train: bool,
    ) -> Result<Option<(Tensor, Vec<f32>)>, TrainingError> {
        if page.nb_edges() == 0 {
            return Ok(None);
        }
        require_labels(page)?;

        let tensors = PageTensors::new(page, self.model.device())?;
        let embeddings = self.model.embed_page(&tensors, train)?;
        let scores =
            EdgeAffinityModel::edge_scores(&embeddings, &tensors.edge_src, &tensors.edge_dst)?;
        let Some(targets) = tensors.labels.as_ref() else {
            return Err(unlabeled(page));
        };

        let loss = per_edge_loss(&scores, targets)?;
        let scores = scores.to_vec1::<f32>()?;
        Ok(Some((loss, scores)))
    }

    /// Summed loss of one page with dropout disabled; `None` when it has no edges.
    pub fn page_loss(&self, page: &PageGraph) -> Result<Option<f64>, TrainingError> {
        match self.forward_page(page, false)? {
            Some((loss, _)) => Ok(Some(loss.to_scalar::<f32>()? as f64)),
            None => Ok(None),
        }
    }

    /// Averages loss and accuracy over `pages` without updating the model.
    pub fn evaluate(&self, pages: &[PageGraph]) -> Result<ValidationReport, TrainingError> {
        let mut total_loss = 0.0;
        let mut total_accuracy = 0.0;
        let mut nb_pages = 0usize;

        for page in pages {
            let Some((loss, scores)) = self.forward_page(page, false)? else {
                continue;
            };
            total_loss += loss.to_scalar::<f32>()? as f64;
            total_accuracy += per_edge_accuracy(&scores, &page.labels).unwrap_or_default();
            nb_pages += 1;
        }

        if nb_pages == 0 {
            return Err(TrainingError::EmptyValidationSet);
        }

        let report = ValidationReport {
            nb_pages,
            avg_loss: total_loss / nb_pages as f64,
            avg_accuracy: total_accuracy / nb_pages as f64,
        };
        info!(
            nb_pages,
            avg_loss = report.avg_loss,
            avg_accuracy = report.avg_accuracy,
            "Validation finished"
        );
        Ok(report)
    }

    /// Sums the losses of `pages` and applies a single optimizer update.
    ///
    /// Pages without edges contribute nothing; if none has edges, no update happens.
    pub fn train_step(&mut self, pages: &[&PageGraph]) -> Result<Option<StepOutcome>, TrainingError> {
        let mut total: Option<Tensor> = None;
        for page in pages {
            if let Some((loss, _)) = self.forward_page(page, true)? {
                total = Some(match total.take() {
                    Some(acc) => (acc + loss)?,
                    None => loss,
                });
            }
        }

        match total {
            Some(loss) => {
                let value = loss.to_scalar::<f32>()? as f64;
                let grad_norm = self.apply(&loss)?;
                Ok(Some(StepOutcome {
                    loss: value,
                    grad_norm,
                }))
            }
            None => Ok(None),
        }
    }

    fn apply(&mut self, loss: &Tensor) -> Result<f64, TrainingError> {
        let grads = loss.backward()?;
        let grad_norm = self.grad_norm(&grads)?;
        self.optimizer.step(&grads)?;
        Ok(grad_norm)
    }

    fn grad_norm(&self, grads: &GradStore) -> Result<f64, TrainingError> {
        let mut norm = 0.0;
        for var in &self.vars {
            if let Some(grad) = grads.get(var.as_tensor()) {
                norm += grad.sqr()?.sum_all()?.sqrt()?.to_scalar::<f32>()? as f64;
            }
        }
        Ok(norm)
    }

    pub fn train(
        &mut self,
        train_pages: &[PageGraph],
        val_pages: &[PageGraph],
    ) -> Result<TrainingSummary, TrainingError> {
        self.train_with(train_pages, val_pages, |_| {})
    }

    /// Runs the configured number of epochs, calling `on_event` as progress is made.
    ///
    /// Validation runs before the first epoch and after every epoch. The model is
    /// written to `save_path` whenever validation accuracy strictly improves, and to
    /// `checkpoint_dir` after every epoch.
    pub fn train_with<F>(
        &mut self,
        train_pages: &[PageGraph],
        val_pages: &[PageGraph],
        mut on_event: F,
    ) -> Result<TrainingSummary, TrainingError>
    where
        F: FnMut(&TrainingEvent),
    {
        for page in train_pages.iter().chain(val_pages) {
            if page.nb_edges() > 0 {
                require_labels(page)?;
            }
        }

        let trainable: Vec<&PageGraph> = train_pages.iter().filter(|p| p.nb_edges() > 0).collect();
        if trainable.is_empty() {
            return Err(TrainingError::EmptyTrainingSet);
        }
        let skipped = train_pages.len() - trainable.len();
        if skipped > 0 {
            debug!(skipped, "Skipping training pages without edges");
        }

        let initial = self.evaluate(val_pages)?;
        on_event(&TrainingEvent::Validation {
            epoch: None,
            report: initial,
        });

        let mut tracker = BestTracker::new();
        let mut best_epoch = None;
        let mut history = Vec::with_capacity(self.config.epochs);

        for epoch in 1..=self.config.epochs {
            let started = Instant::now();
            self.run_epoch(epoch, &trainable, &mut on_event)?;

            let report = self.evaluate(val_pages)?;
            on_event(&TrainingEvent::Validation {
                epoch: Some(epoch),
                report,
            });
            history.push(report);

            if tracker.update(report.avg_accuracy) {
                best_epoch = Some(epoch);
                if let Some(path) = &self.config.save_path {
                    save_best(&self.model, path, report.avg_accuracy)?;
                    on_event(&TrainingEvent::BestSaved {
                        epoch,
                        path: path.clone(),
                        accuracy: report.avg_accuracy,
                    });
                }
            }

            if let Some(dir) = &self.config.checkpoint_dir {
                let path = epoch_checkpoint_path(dir, epoch);
                self.model.save(&path)?;
                on_event(&TrainingEvent::CheckpointSaved { epoch, path });
            }

            info!(
                epoch,
                elapsed_s = started.elapsed().as_secs_f64(),
                val_loss = report.avg_loss,
                val_accuracy = report.avg_accuracy,
                "Epoch finished"
            );
        }

        Ok(TrainingSummary {
            initial,
            history,
            best_accuracy: tracker.best(),
            best_epoch,
        })
    }

    fn run_epoch<F>(
        &mut self,
        epoch: usize,
        trainable: &[&PageGraph],
        on_event: &mut F,
    ) -> Result<(), TrainingError>
    where
        F: FnMut(&TrainingEvent),
    {
        let mut order: Vec<usize> = (0..trainable.len()).collect();
        order.shuffle(&mut self.rng);

        let mut stats = RunningStats::new();
        let mut pending: Option<Tensor> = None;
        let mut nb_pending = 0usize;

        for (position, &index) in order.iter().enumerate() {
            let Some((loss, _)) = self.forward_page(trainable[index], true)? else {
                continue;
            };
            stats.record_page(loss.to_scalar::<f32>()? as f64);

            pending = Some(match pending.take() {
                Some(acc) => (acc + loss)?,
                None => loss,
            });
            nb_pending += 1;

            // The last page flushes an incomplete accumulation window.
            let last = position + 1 == order.len();
            if (nb_pending == self.config.grad_accumulation || last)
                && let Some(total) = pending.take()
            {
                let grad_norm = self.apply(&total)?;
                stats.record_grad_norm(grad_norm);
                nb_pending = 0;
            }

            if (position + 1) % self.config.report_every == 0 {
                let report = stats.take_report(position + 1);
                info!(
                    epoch,
                    pages_seen = report.pages_seen,
                    avg_loss = report.avg_loss,
                    avg_time_ms = report.avg_time.as_secs_f64() * 1000.0,
                    grad_norm = report.latest_grad_norm,
                    "Training progress"
                );
                on_event(&TrainingEvent::Window { epoch, report });
            }
        }

        Ok(())
    }
}

fn require_labels(page: &PageGraph) -> Result<(), TrainingError> {
    page.validate_labeled().map_err(|err| match err {
        GraphError::LabelLengthMismatch { labels: 0, .. } => unlabeled(page),
        other => other.into(),
    })
}

fn unlabeled(page: &PageGraph) -> TrainingError {
    TrainingError::UnlabeledPage {
        page: page.name.clone(),
        edges: page.nb_edges(),
        labels: page.labels.len(),
    }
}

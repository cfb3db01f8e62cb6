//! Online learning models
//!
//! Both estimators are a running standard scaler feeding a linear model
//! trained by single-example SGD:
//! - [`FingerEstimator`]: least-squares regression on the finger count
//! - [`ChoiceEstimator`]: logistic regression on "player picks odds"
//!
//! [`ModelState`] bundles both with their running accuracy metrics and is
//! the only thing written to the model blob.

use serde::{Deserialize, Serialize};

use crate::error::{OpponentError, Result};
use crate::features::FEATURE_COUNT;

/// Bumped whenever the serialized layout of [`ModelState`] changes
pub const MODEL_FORMAT_VERSION: u32 = 1;

/// Gradients beyond this magnitude are clipped
const GRADIENT_CLIP: f64 = 1e12;

type Vector = [f64; FEATURE_COUNT];

/// Per-feature running mean and variance (Welford)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    count: u64,
    mean: Vector,
    m2: Vector,
}

impl StandardScaler {
    pub fn new() -> Self {
        Self {
            count: 0,
            mean: [0.0; FEATURE_COUNT],
            m2: [0.0; FEATURE_COUNT],
        }
    }

    pub fn learn(&mut self, x: &Vector) {
        self.count += 1;
        let n = self.count as f64;
        for i in 0..FEATURE_COUNT {
            let delta = x[i] - self.mean[i];
            self.mean[i] += delta / n;
            let delta2 = x[i] - self.mean[i];
            self.m2[i] += delta * delta2;
        }
    }

    /// Standardize `x`. Features with no spread yet map to 0.
    pub fn transform(&self, x: &Vector) -> Vector {
        let mut out = [0.0; FEATURE_COUNT];
        if self.count == 0 {
            return out;
        }
        let n = self.count as f64;
        for i in 0..FEATURE_COUNT {
            let std = (self.m2[i] / n).sqrt();
            out[i] = if std > 0.0 { (x[i] - self.mean[i]) / std } else { 0.0 };
        }
        out
    }
}

impl Default for StandardScaler {
    fn default() -> Self {
        Self::new()
    }
}

/// Weights and intercept shared by both estimators
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    weights: Vector,
    intercept: f64,
    learning_rate: f64,
}

impl LinearModel {
    pub fn new(learning_rate: f64) -> Self {
        Self {
            weights: [0.0; FEATURE_COUNT],
            intercept: 0.0,
            learning_rate,
        }
    }

    fn raw(&self, x: &Vector) -> f64 {
        self.weights.iter().zip(x.iter()).map(|(w, v)| w * v).sum::<f64>() + self.intercept
    }

    /// One SGD step given d(loss)/d(raw output)
    fn step(&mut self, x: &Vector, gradient: f64) -> Result<()> {
        let g = gradient.clamp(-GRADIENT_CLIP, GRADIENT_CLIP);
        let mut weights = self.weights;
        for i in 0..FEATURE_COUNT {
            weights[i] -= self.learning_rate * g * x[i];
        }
        let intercept = self.intercept - self.learning_rate * g;

        if !intercept.is_finite() || weights.iter().any(|w| !w.is_finite()) {
            return Err(OpponentError::Learning("weights diverged".to_string()));
        }

        self.weights = weights;
        self.intercept = intercept;
        Ok(())
    }
}

fn check_input(x: &Vector) -> Result<()> {
    if x.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(OpponentError::Prediction("non-finite feature value".to_string()))
    }
}

/// Finger-count regressor
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FingerEstimator {
    scaler: StandardScaler,
    model: LinearModel,
}

impl FingerEstimator {
    pub fn new(learning_rate: f64) -> Self {
        Self {
            scaler: StandardScaler::new(),
            model: LinearModel::new(learning_rate),
        }
    }

    /// Raw continuous estimate. Callers must round and clamp it.
    pub fn predict(&self, x: &Vector) -> Result<f64> {
        check_input(x)?;
        let y = self.model.raw(&self.scaler.transform(x));
        if y.is_finite() {
            Ok(y)
        } else {
            Err(OpponentError::Prediction(format!("finger estimate is {}", y)))
        }
    }

    pub fn learn(&mut self, x: &Vector, y: f64) -> Result<()> {
        check_input(x).map_err(|e| OpponentError::Learning(e.to_string()))?;
        if !y.is_finite() {
            return Err(OpponentError::Learning(format!("target is {}", y)));
        }
        self.scaler.learn(x);
        let z = self.scaler.transform(x);
        let gradient = self.model.raw(&z) - y;
        self.model.step(&z, gradient)
    }
}

/// Odds-vs-evens classifier
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChoiceEstimator {
    scaler: StandardScaler,
    model: LinearModel,
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

impl ChoiceEstimator {
    pub fn new(learning_rate: f64) -> Self {
        Self {
            scaler: StandardScaler::new(),
            model: LinearModel::new(learning_rate),
        }
    }

    /// Probability that the player declares odds
    pub fn predict_proba(&self, x: &Vector) -> Result<f64> {
        check_input(x)?;
        let p = sigmoid(self.model.raw(&self.scaler.transform(x)));
        if p.is_finite() {
            Ok(p)
        } else {
            Err(OpponentError::Prediction(format!("odds probability is {}", p)))
        }
    }

    pub fn learn(&mut self, x: &Vector, picked_odds: bool) -> Result<()> {
        check_input(x).map_err(|e| OpponentError::Learning(e.to_string()))?;
        self.scaler.learn(x);
        let z = self.scaler.transform(x);
        let target = if picked_odds { 1.0 } else { 0.0 };
        let gradient = sigmoid(self.model.raw(&z)) - target;
        self.model.step(&z, gradient)
    }
}

/// Running mean absolute error
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Mae {
    total: f64,
    count: u64,
}

impl Mae {
    pub fn update(&mut self, actual: f64, predicted: f64) {
        self.total += (actual - predicted).abs();
        self.count += 1;
    }

    pub fn get(&self) -> Option<f64> {
        (self.count > 0).then(|| self.total / self.count as f64)
    }
}

/// Running classification accuracy
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Accuracy {
    correct: u64,
    count: u64,
}

impl Accuracy {
    pub fn update(&mut self, actual: bool, predicted: bool) {
        if actual == predicted {
            self.correct += 1;
        }
        self.count += 1;
    }

    pub fn get(&self) -> Option<f64> {
        (self.count > 0).then(|| self.correct as f64 / self.count as f64)
    }
}

/// Everything the online predictor has learned
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelState {
    version: u32,
    pub finger: FingerEstimator,
    pub choice: ChoiceEstimator,
    pub finger_mae: Mae,
    pub choice_accuracy: Accuracy,
}

impl ModelState {
    pub fn new(learning_rate: f64) -> Self {
        Self {
            version: MODEL_FORMAT_VERSION,
            finger: FingerEstimator::new(learning_rate),
            choice: ChoiceEstimator::new(learning_rate),
            finger_mae: Mae::default(),
            choice_accuracy: Accuracy::default(),
        }
    }

    /// Rounds the models have been trained on
    pub fn examples_seen(&self) -> u64 {
        self.finger.scaler.count
    }

    /// Serialize to bytes (MessagePack)
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec_named(self)?)
    }

    /// Deserialize from bytes, rejecting other format versions
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let state: Self = rmp_serde::from_slice(bytes)?;
        if state.version != MODEL_FORMAT_VERSION {
            return Err(OpponentError::IncompatibleModel {
                found: state.version,
                expected: MODEL_FORMAT_VERSION,
            });
        }
        Ok(state)
    }
}

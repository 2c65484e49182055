//! Per-tree biomass from species allometry.
//!
//! A species either carries its own formula, which is compiled once and
//! evaluated for every tree, or has none, in which case the simple
//! `0.11 × ρ × D² × H` fallback applies.

use canopy_formula::{Formula, normalize, simple_allometric_biomass};
use canopy_schemas::{
    SpeciesAllometry, TreeBiomass, TreeMeasurement, TreeSurvey,
};
use tracing::{debug, debug_span};

use crate::error::CalibrateError;

/// How biomass is computed for one species.
#[derive(Debug, Clone)]
pub enum BiomassEquation {
    /// The species' own formula.
    Formula(Formula),
    /// [`simple_allometric_biomass`], for species without a formula.
    SimpleAllometric,
}

/// A species prepared for biomass computation.
#[derive(Debug, Clone)]
pub struct SpeciesBiomass {
    equation: BiomassEquation,
    wood_density: Option<f64>,
}

impl SpeciesBiomass {
    /// Compiles the species formula, if it has one.
    ///
    /// The stored formula is normalized first, so formulas saved before
    /// normalization existed (with `ln` or `^`) still compile.
    pub fn new(species: &SpeciesAllometry) -> Result<Self, CalibrateError> {
        let equation = match species.formula() {
            Some(text) => BiomassEquation::Formula(
                Formula::compile(&normalize(text))
                    .map_err(|e| CalibrateError::formula(None, e))?,
            ),
            None => BiomassEquation::SimpleAllometric,
        };
        Ok(Self {
            equation,
            wood_density: species.wood_density.filter(|&wd| wd != 0.0),
        })
    }

    /// The equation this species uses.
    pub fn equation(&self) -> &BiomassEquation {
        &self.equation
    }

    /// Computes biomass for one tree.
    ///
    /// Formula failures name the tree when it has an identifier.
    pub fn tree_biomass(
        &self,
        tree: &TreeMeasurement,
    ) -> Result<f64, CalibrateError> {
        match &self.equation {
            BiomassEquation::SimpleAllometric => Ok(simple_allometric_biomass(
                tree.dbh_cm,
                tree.height_m,
                self.wood_density,
            )),
            BiomassEquation::Formula(formula) => formula
                .evaluate(&tree_variables(tree, self.wood_density))
                .map_err(|e| CalibrateError::formula(tree.id.as_deref(), e)),
        }
    }
}

/// Variables offered to species formulas for one tree.
///
/// Missing optional measurements are bound to `0.0`, so a formula using
/// them still evaluates (and typically hits a domain error on `log(0)`
/// rather than an unknown variable). `dbh` aliases `dbh_cm` for formulas
/// written against the built-in default.
pub fn tree_variables(
    tree: &TreeMeasurement,
    wood_density: Option<f64>,
) -> [(&'static str, f64); 5] {
    [
        ("dbh_cm", tree.dbh_cm),
        ("dbh", tree.dbh_cm),
        ("height_m", tree.height_m.unwrap_or(0.0)),
        ("circumference_cm", tree.circumference_cm.unwrap_or(0.0)),
        ("wood_density", wood_density.unwrap_or(0.0)),
    ]
}

/// Computes biomass for every tree of a survey, stopping at the first
/// failure.
pub fn survey_biomass(
    survey: &TreeSurvey,
) -> Result<Vec<TreeBiomass>, CalibrateError> {
    let _span =
        debug_span!("survey_biomass", trees = survey.trees.len()).entered();

    let species = SpeciesBiomass::new(&survey.species)?;
    debug!(equation = ?species.equation(), "prepared species");

    survey
        .trees
        .iter()
        .map(|tree| -> Result<TreeBiomass, CalibrateError> {
            Ok(TreeBiomass {
                id: tree.id.clone(),
                biomass: species.tree_biomass(tree)?,
            })
        })
        .collect()
}

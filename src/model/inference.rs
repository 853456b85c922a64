use tracing::debug;

use crate::cluster::groupings_from_edges;
use crate::constants::EDGE_PROBABILITY_THRESHOLD;
use crate::graph::PageGraph;

use super::affinity::EdgeAffinityModel;
use super::error::ModelError;

/// Edges of `page` whose "same bite" probability exceeds the threshold.
pub fn accepted_edges(
    model: &EdgeAffinityModel,
    page: &PageGraph,
) -> Result<Vec<(usize, usize)>, ModelError> {
    let probabilities = model.edge_probabilities(page)?;
    Ok(page
        .edges()
        .zip(probabilities)
        .filter(|(_, p)| *p > EDGE_PROBABILITY_THRESHOLD)
        .map(|(edge, _)| edge)
        .collect())
}

/// Clusters the lines of one page into bites.
///
/// Every node ends up in exactly one bite; nodes with no accepted edge are
/// singletons.
pub fn infer_page(
    model: &EdgeAffinityModel,
    page: &PageGraph,
) -> Result<Vec<Vec<String>>, ModelError> {
    let accepted = accepted_edges(model, page)?;
    let nb_accepted = accepted.len();
    let groupings = groupings_from_edges(page.nb_nodes(), accepted)?;

    debug!(
        page = %page.name,
        nb_edges = page.nb_edges(),
        nb_accepted,
        nb_bites = groupings.len(),
        "Page clustered"
    );

    Ok(groupings
        .into_iter()
        .map(|group| group.into_iter().map(|node| page.line_id(node)).collect())
        .collect())
}

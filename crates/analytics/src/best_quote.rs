//! Best-quote selection.
//!
//! One row per ISIN: the highest-yield offer among quotes with a positive
//! quantity. Every view that needs best quotes goes through [`select_best`].

use std::cmp::{Ordering, Reverse};
use std::collections::{HashMap, HashSet};

use axes_core::{BestQuote, Quote};
use ordered_float::OrderedFloat;
use tracing::debug;

#[derive(Default)]
struct IsinGroup<'a> {
    dealers: HashSet<&'a str>,
    best: Option<(usize, &'a Quote)>,
}

/// Ordering key of a candidate: higher yield wins, then the lowest dealer
/// name, then the earliest row. Quotes without a dealer lose name ties.
fn rank(index: usize, quote: &Quote) -> (OrderedFloat<f64>, Reverse<(bool, Option<&str>)>, Reverse<usize>) {
    let dealer = quote.dealer.as_deref();
    (
        OrderedFloat(quote.offer_yield),
        Reverse((dealer.is_none(), dealer)),
        Reverse(index),
    )
}

fn is_candidate(quote: &Quote) -> bool {
    quote.offer_qty > 0.0
}

/// Reduce cleaned quotes to one best quote per ISIN.
///
/// `Nb_Dealers_AXE` counts distinct dealers over all quotes of the ISIN,
/// actionable or not. ISINs without any positive-quantity quote are absent,
/// as is a lone dealer whose quantity is zero. Output follows the first
/// appearance of each ISIN in the input.
pub fn select_best(quotes: &[Quote]) -> Vec<BestQuote> {
    let mut order: Vec<&str> = Vec::new();
    let mut groups: HashMap<&str, IsinGroup<'_>> = HashMap::new();

    for (index, quote) in quotes.iter().enumerate() {
        let Some(isin) = quote.isin.as_deref() else {
            continue;
        };
        let group = groups.entry(isin).or_insert_with(|| {
            order.push(isin);
            IsinGroup::default()
        });
        if let Some(dealer) = quote.dealer.as_deref() {
            group.dealers.insert(dealer);
        }
        if !is_candidate(quote) {
            continue;
        }
        let replace = match group.best {
            None => true,
            Some((best_index, best)) => {
                rank(index, quote).cmp(&rank(best_index, best)) == Ordering::Greater
            }
        };
        if replace {
            group.best = Some((index, quote));
        }
    }

    let best: Vec<BestQuote> = order
        .iter()
        .filter_map(|isin| {
            let group = groups.get(isin)?;
            let (_, quote) = group.best?;
            let nb_dealers_axe = group.dealers.len() as u32;
            if nb_dealers_axe == 1 && quote.offer_qty == 0.0 {
                return None;
            }
            Some(BestQuote {
                quote: quote.clone(),
                nb_dealers_axe,
            })
        })
        .collect();

    debug!(quotes = quotes.len(), isins = order.len(), best = best.len(), "selected best quotes");
    best
}

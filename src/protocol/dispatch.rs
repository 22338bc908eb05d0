use tracing::debug;

use crate::catalog::CatalogIndex;

use super::message::{EntryInfo, Request, Response};

/// Answer one typed request against the index.
pub fn dispatch(index: &mut CatalogIndex, request: Request) -> Response {
    match request {
        Request::LookUp { text, max_results } => {
            let max = match max_results {
                Some(max) => usize::try_from(max).unwrap_or(usize::MAX),
                None => index.max_results(),
            };
            let results = index.query(&text, max);
            debug!(query = %text, max, results = results.len(), "lookUp");
            Response::Results { results }
        }
        Request::Execute { id } => {
            let success = index.execute(&id);
            Response::Executed { id, success }
        }
        Request::GetEntries { ids } => {
            let mut entries = Vec::with_capacity(ids.len());
            let mut not_found = Vec::new();
            for id in ids {
                match index.get_by_id(&id) {
                    Some(descriptor) => entries.push(EntryInfo::from(&descriptor)),
                    None => not_found.push(id),
                }
            }
            Response::Entries { entries, not_found }
        }
        Request::GetAll => Response::Entries {
            entries: index.get_all().iter().map(EntryInfo::from).collect(),
            not_found: Vec::new(),
        },
        Request::LoadTracking { counts } => {
            let count = counts.len();
            index.load_tracking(counts);
            Response::TrackingLoaded { count }
        }
        Request::Tracking => Response::Tracking {
            counts: index.tracking(),
        },
        Request::Recent => Response::Recent {
            ids: index.recent(),
        },
        Request::Missing => Response::Missing {
            missing: index.missing().to_vec(),
        },
    }
}

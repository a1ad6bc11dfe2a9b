//! Output of one synthesis pass.

use std::collections::BTreeSet;

use crate::policy::{GlobalSettings, PolicySet};
use crate::routing::AssembledRoute;

/// Everything this agent wants the shared document to contain.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DesiredState {
    /// Routes in service order, then route index order.
    pub routes: Vec<AssembledRoute>,
    pub policies: PolicySet,
    pub settings: GlobalSettings,
}

impl DesiredState {
    pub fn route_ids(&self) -> BTreeSet<String> {
        self.routes.iter().map(|r| r.id().to_string()).collect()
    }
}

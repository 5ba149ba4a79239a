//! Chain builder.
//!
//! Starting from a leaf entity's self-issued configuration, follows declared
//! authority hints upward, fetching superior configurations and subordinate
//! statements until a branch terminates at a registered trust anchor or
//! options are exhausted. Branches are independent: hints at every hop are
//! explored concurrently, and one branch failing never aborts its siblings.

use crate::chain::{AnchorConfirmation, AnchorLink, TrustChain};
use crate::discovery::EntityDiscoveryClient;
use crate::error::TrustError;
use crate::models::EntityStatement;
use crate::registry::TrustAnchorRegistry;
use fedra_core::EntityId;
use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use tokio::task::JoinSet;
use tracing::{debug, instrument};

/// Configuration for chain building.
#[derive(Debug, Clone)]
pub struct BuilderConfig {
    /// Maximum number of superior hops explored from the leaf.
    pub max_depth: usize,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self { max_depth: 5 }
    }
}

/// Result of one build: every chain that reached a registered anchor, plus
/// the failure recorded for each branch that did not.
#[derive(Debug)]
pub struct BuildOutcome {
    /// Successful chains, ordered by the declared order of the authority
    /// hints that produced them.
    pub chains: Vec<TrustChain>,
    /// Branch-local failures, for diagnosis when no chain validates.
    pub failures: Vec<TrustError>,
}

/// A partial chain: the statements above some entity, anchor-side last,
/// plus the anchor confirmation.
type Ascent = (Vec<EntityStatement>, AnchorConfirmation);
type ExploreResult = (Vec<Ascent>, Vec<TrustError>);
type BoxedExplore = Pin<Box<dyn Future<Output = ExploreResult> + Send>>;

/// Chain builder.
#[derive(Debug, Clone)]
pub struct ChainBuilder {
    discovery: EntityDiscoveryClient,
    registry: TrustAnchorRegistry,
    config: BuilderConfig,
}

impl ChainBuilder {
    /// A builder using the given discovery client and registry.
    #[must_use]
    pub fn new(
        discovery: EntityDiscoveryClient,
        registry: TrustAnchorRegistry,
        config: BuilderConfig,
    ) -> Self {
        Self {
            discovery,
            registry,
            config,
        }
    }

    /// Build every candidate chain from a leaf's self-issued configuration
    /// to a registered trust anchor.
    ///
    /// Returns all successful completions; callers choose between first
    /// success and all chains. An empty `chains` with no recorded failure
    /// means the leaf declared no viable authority hints.
    #[instrument(skip(self, leaf), fields(leaf = %leaf.subject()))]
    pub async fn build_chains(&self, leaf: &EntityStatement) -> BuildOutcome {
        let mut visited = HashSet::new();
        visited.insert(leaf.subject().clone());

        let (ascents, failures) = self.clone().explore(leaf.clone(), 0, visited).await;

        let chains = ascents
            .into_iter()
            .map(|(upper, anchor)| {
                let mut statements = vec![leaf.clone()];
                statements.extend(upper);
                TrustChain { statements, anchor }
            })
            .collect();

        BuildOutcome { chains, failures }
    }

    /// Explore every authority hint of `subject`, returning the statement
    /// ascents that reach an anchor. Boxed because the hint graph recurses.
    fn explore(
        self,
        subject: EntityStatement,
        depth: usize,
        visited: HashSet<EntityId>,
    ) -> BoxedExplore {
        Box::pin(async move {
            if depth >= self.config.max_depth {
                return (
                    Vec::new(),
                    vec![TrustError::ChainTooDeep {
                        max_depth: self.config.max_depth,
                    }],
                );
            }

            let hints = subject.claims.authority_hints.clone();
            let mut tasks: JoinSet<(usize, ExploreResult)> = JoinSet::new();

            for (index, hint) in hints.into_iter().enumerate() {
                if visited.contains(&hint) {
                    debug!(hint = %hint, "authority-hint cycle short-circuited");
                    continue;
                }

                let this = self.clone();
                let subject = subject.clone();
                let mut visited = visited.clone();
                visited.insert(hint.clone());

                tasks.spawn(async move {
                    (index, this.explore_hint(subject, hint, depth, visited).await)
                });
            }

            // Reassemble in declared-hint order so chain preference is
            // deterministic regardless of completion order.
            let mut indexed: Vec<(usize, ExploreResult)> = Vec::new();
            while let Some(joined) = tasks.join_next().await {
                if let Ok(result) = joined {
                    indexed.push(result);
                }
            }
            indexed.sort_by_key(|(index, _)| *index);

            let mut ascents = Vec::new();
            let mut failures = Vec::new();
            for (_, (branch_ascents, branch_failures)) in indexed {
                ascents.extend(branch_ascents);
                failures.extend(branch_failures);
            }
            (ascents, failures)
        })
    }

    /// Explore a single authority hint of `subject`.
    async fn explore_hint(
        self,
        subject: EntityStatement,
        hint: EntityId,
        depth: usize,
        visited: HashSet<EntityId>,
    ) -> ExploreResult {
        let superior = match self.discovery.fetch_entity_configuration(&hint).await {
            Ok(config) => config,
            Err(err) => {
                debug!(hint = %hint, error = %err, "superior configuration fetch failed");
                return (Vec::new(), vec![err]);
            }
        };

        if self.registry.is_trust_anchor(&hint).await {
            return self.terminate_at_anchor(&subject, superior).await;
        }

        // Intermediate superior: the link statement is required.
        let Some(endpoint) = superior.claims.federation_fetch_endpoint().map(str::to_string)
        else {
            return (
                Vec::new(),
                vec![TrustError::ChainInvalid {
                    reason: format!(
                        "intermediate superior {} declares no fetch endpoint",
                        superior.subject()
                    ),
                }],
            );
        };
        let statement = match self
            .fetch_link_statement(&superior, &endpoint, subject.subject())
            .await
        {
            Ok(statement) => statement,
            Err(err) => return (Vec::new(), vec![err]),
        };

        let (upper, failures) = self
            .clone()
            .explore(superior, depth + 1, visited)
            .await;

        let ascents = upper
            .into_iter()
            .map(|(mut rest, anchor)| {
                rest.insert(0, statement.clone());
                (rest, anchor)
            })
            .collect();
        (ascents, failures)
    }

    /// Complete a branch whose superior is a registered anchor.
    ///
    /// The subordinate statement is fetched whenever the anchor exposes a
    /// fetch endpoint. Its absence is permissible only when the anchor's own
    /// configuration lists the subject as a subordinate by exact entity id.
    async fn terminate_at_anchor(
        &self,
        subject: &EntityStatement,
        anchor_config: EntityStatement,
    ) -> ExploreResult {
        let fetch_failure = match anchor_config.claims.federation_fetch_endpoint() {
            Some(endpoint) => {
                match self
                    .fetch_link_statement(&anchor_config, endpoint, subject.subject())
                    .await
                {
                    Ok(statement) => {
                        let anchor = AnchorConfirmation {
                            configuration: anchor_config,
                            link: AnchorLink::SubordinateStatement,
                        };
                        return (vec![(vec![statement], anchor)], Vec::new());
                    }
                    Err(err) => Some(err),
                }
            }
            None => None,
        };

        if anchor_config.claims.lists_subordinate(subject.subject()) {
            let anchor = AnchorConfirmation {
                configuration: anchor_config,
                link: AnchorLink::ListedSubordinate,
            };
            return (vec![(Vec::new(), anchor)], Vec::new());
        }

        let failure = fetch_failure.unwrap_or_else(|| TrustError::ChainInvalid {
            reason: format!(
                "anchor {} exposes no fetch endpoint and does not list {} as a subordinate",
                anchor_config.issuer(),
                subject.subject()
            ),
        });
        (Vec::new(), vec![failure])
    }

    /// Fetch the statement a superior issued about `subject` from a known
    /// fetch endpoint, checking the statement really comes from that
    /// superior.
    async fn fetch_link_statement(
        &self,
        superior: &EntityStatement,
        endpoint: &str,
        subject: &EntityId,
    ) -> Result<EntityStatement, TrustError> {
        let statement = self
            .discovery
            .fetch_subordinate_statement(endpoint, subject)
            .await?;

        if statement.issuer() != superior.subject() {
            return Err(TrustError::DiscoveryFailed {
                entity: subject.to_string(),
                message: format!(
                    "fetch endpoint of {} returned a statement issued by {}",
                    superior.subject(),
                    statement.issuer()
                ),
            });
        }
        Ok(statement)
    }
}

//! Collection hydration: join port records into dossiers.

use std::collections::HashMap;

use chrono::{Datelike, Utc};
use futures::future::{try_join4, try_join_all};
use tracing::{debug, instrument};

use dacdash_common::dossier::{
    ClaimRow, CollaborationRow, Dossier, EvidenceRow, FeedRow, FundingRow, ImageRow, InteractionRow, ProjectRow,
};
use dacdash_common::entities::{Claim, Document, DocumentKind, Org, Project, Relation};
use dacdash_common::Result;

use crate::port::DataPort;

/// Fetch every organisation and its sub-resources, in collection order.
#[instrument(skip(port))]
pub async fn load_dossiers(port: &dyn DataPort) -> Result<Vec<Dossier>> {
    let orgs = port.search_entities(None, None).await?;
    let lookup: HashMap<&str, &Org> = orgs.iter().map(|o| (o.id.as_str(), o)).collect();

    let parts = try_join_all(orgs.iter().map(|org| async move {
        try_join4(
            port.get_projects(&org.id),
            port.get_claims(&org.id),
            port.get_relations(&org.id, None),
            port.get_documents(&org.id),
        )
        .await
    }))
    .await?;

    let dossiers: Vec<Dossier> = orgs
        .iter()
        .zip(parts)
        .map(|(org, (projects, claims, relations, documents))| {
            hydrate(org, &projects, &claims, &relations, &documents, &lookup)
        })
        .collect();

    debug!(count = dossiers.len(), "Hydrated dossiers");
    Ok(dossiers)
}

fn name_of(lookup: &HashMap<&str, &Org>, id: &str) -> String {
    lookup.get(id).map(|o| o.name.clone()).unwrap_or_else(|| id.to_string())
}

fn feed_row(doc: &Document) -> FeedRow {
    FeedRow { date: doc.published_on, title: doc.title.clone(), link: doc.url.clone() }
}

/// Build the display model for one organisation.
pub fn hydrate(
    org: &Org,
    projects: &[Project],
    claims: &[Claim],
    relations: &[Relation],
    documents: &[Document],
    lookup: &HashMap<&str, &Org>,
) -> Dossier {
    let collaborations = relations
        .iter()
        .map(|r| CollaborationRow {
            with: name_of(lookup, r.counterpart(&org.id)),
            kind: r.relation_type.label().to_string(),
            start_date: r.since,
        })
        .collect();

    let projects = projects
        .iter()
        .map(|p| ProjectRow {
            name: p.name.clone(),
            kind: p.project_type.label().to_string(),
            location: p.location.clone().unwrap_or_else(|| "-".to_string()),
            status: p.status.clone(),
            start_date: p.start_date,
            capacity: p.capacity_t_co2_per_year.unwrap_or(0.0),
            partners: p.partners.iter().map(|id| name_of(lookup, id)).collect(),
        })
        .collect();

    let claims = claims
        .iter()
        .map(|c| ClaimRow {
            id: c.id.clone(),
            text: c.statement.clone(),
            metric_type: c.metric.clone(),
            unit: c.unit.clone(),
            min: c.min.unwrap_or(0.0),
            ml: c.ml.unwrap_or(0.0),
            max: c.max.unwrap_or(0.0),
            trust: c.rag.label().to_string(),
            trust_score: c.trust.score(),
            evidence: c
                .evidence
                .iter()
                .map(|e| EvidenceRow {
                    kind: e.kind.label().to_string(),
                    title: e.title.clone(),
                    url: Some(e.url.clone().unwrap_or_else(|| "#".to_string())),
                    date: e.published_on,
                })
                .collect(),
        })
        .collect();

    let by_kind = |kind: DocumentKind| -> Vec<FeedRow> {
        documents.iter().filter(|d| d.kind == kind).map(feed_row).collect()
    };
    // Blog posts surface alongside news
    let mut news = by_kind(DocumentKind::News);
    news.extend(by_kind(DocumentKind::Blog));

    Dossier {
        id: org.id.clone(),
        slug: org.slug.clone(),
        name: org.name.clone(),
        website: org.website.clone().unwrap_or_else(|| "#".to_string()),
        country: org.country.clone().unwrap_or_default(),
        approach: org.approach.clone(),
        stage: org.stage.label().to_string(),
        founded: org.founded_year.unwrap_or_else(|| Utc::now().year()),
        total_funding: org.total_funding_usd.unwrap_or(0.0),
        freshness_days: org.freshness_days.unwrap_or(0),
        description: org.description.clone().unwrap_or_default(),
        aliases: org.aliases.clone(),
        logo_url: org.logo_url.clone(),
        collaborations,
        funding_rounds: org
            .funding_rounds
            .iter()
            .map(|f| FundingRow {
                date: f.announced_on,
                round: f.round.clone(),
                amount_usd: f.amount_usd,
                investors: f.investors.clone(),
            })
            .collect(),
        projects,
        interactions: org
            .interactions
            .iter()
            .map(|i| InteractionRow {
                date: i.occurred_on,
                kind: i.kind.clone(),
                attendees: i.attendees.clone(),
                summary: i.summary.clone().unwrap_or_default(),
            })
            .collect(),
        claims,
        publications: by_kind(DocumentKind::Publication),
        patents: by_kind(DocumentKind::Patent),
        news,
        overview_images: org
            .overview_images
            .iter()
            .map(|m| ImageRow { src: m.src.clone(), caption: m.caption.clone() })
            .collect(),
    }
}

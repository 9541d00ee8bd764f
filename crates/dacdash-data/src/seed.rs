//! Demo organisations used by the shell and by tests.

use chrono::NaiveDate;

use dacdash_common::entities::*;

use crate::memory::Tables;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
}

fn org(id: &str, name: &str, kind: OrgKind, stage: Stage, approach: &str) -> Org {
    Org {
        id: id.to_string(),
        slug: id.to_string(),
        name: name.to_string(),
        org_kind: kind,
        stage,
        approach: approach.to_string(),
        description: None,
        country: None,
        website: None,
        founded_year: None,
        total_funding_usd: None,
        freshness_days: None,
        aliases: Vec::new(),
        logo_url: None,
        funding_rounds: Vec::new(),
        interactions: Vec::new(),
        overview_images: Vec::new(),
    }
}

pub fn demo_orgs() -> Vec<Org> {
    let mut climeworks = org("climeworks", "Climeworks", OrgKind::TechnologyVendor, Stage::Commercial, "Solid sorbent");
    climeworks.country = Some("Switzerland".into());
    climeworks.website = Some("https://climeworks.com".into());
    climeworks.description = Some("Operates the Orca and Mammoth plants in Iceland.".into());
    climeworks.founded_year = Some(2009);
    climeworks.total_funding_usd = Some(800_000_000.0);
    climeworks.freshness_days = Some(12);
    climeworks.funding_rounds.push(FundingRound {
        id: "fr-cw-1".into(),
        org_id: "climeworks".into(),
        announced_on: date(2022, 4, 5),
        round: "Equity".into(),
        amount_usd: 650_000_000.0,
        investors: vec!["Partners Group".into(), "GIC".into()],
        source: None,
    });
    climeworks.interactions.push(Interaction {
        id: "int-cw-1".into(),
        org_id: "climeworks".into(),
        occurred_on: date(2025, 9, 18),
        kind: "Call".into(),
        summary: Some("Offtake pricing update".into()),
        attendees: vec!["Analyst team".into()],
    });

    let mut heirloom = org("heirloom", "Heirloom", OrgKind::Startup, Stage::CommercialPilot, "Mineral looping");
    heirloom.country = Some("United States".into());
    heirloom.website = Some("https://heirloomcarbon.com".into());
    heirloom.description = Some("Limestone-based capture in Tracy, California.".into());
    heirloom.founded_year = Some(2020);
    heirloom.total_funding_usd = Some(54_000_000.0);
    heirloom.freshness_days = Some(40);
    heirloom.aliases = vec!["Heirloom Carbon".into()];

    let mut ce = org("carbon-engineering", "Carbon Engineering", OrgKind::TechnologyVendor, Stage::Commercial, "Liquid solvent");
    ce.country = Some("Canada".into());
    ce.description = Some("Liquid solvent DAC licensed for the Stratos plant in Texas.".into());
    ce.founded_year = Some(2009);
    ce.total_funding_usd = Some(110_000_000.0);
    ce.freshness_days = Some(95);

    let mut carbfix = org("carbfix", "Carbfix", OrgKind::StoragePartner, Stage::Commercial, "Mineral storage");
    carbfix.country = Some("Iceland".into());
    carbfix.description = Some("Injects dissolved CO2 into basalt.".into());
    carbfix.total_funding_usd = Some(20_000_000.0);

    vec![climeworks, heirloom, ce, carbfix]
}

pub fn demo_tables() -> Tables {
    let projects = vec![
        Project {
            id: "prj-orca".into(),
            org_id: "climeworks".into(),
            name: "Orca".into(),
            project_type: ProjectType::Commercial,
            stage: Stage::Commercial,
            status: "Operational".into(),
            location: Some("Hellisheidi, Iceland".into()),
            capacity_t_co2_per_year: Some(4_000.0),
            start_date: Some(date(2021, 9, 8)),
            partners: vec!["carbfix".into()],
        },
        Project {
            id: "prj-mammoth".into(),
            org_id: "climeworks".into(),
            name: "Mammoth".into(),
            project_type: ProjectType::Commercial,
            stage: Stage::Commercial,
            status: "Operational".into(),
            location: Some("Hellisheidi, Iceland".into()),
            capacity_t_co2_per_year: Some(36_000.0),
            start_date: Some(date(2024, 5, 8)),
            partners: vec!["carbfix".into()],
        },
        Project {
            id: "prj-tracy".into(),
            org_id: "heirloom".into(),
            name: "Tracy".into(),
            project_type: ProjectType::Pilot,
            stage: Stage::CommercialPilot,
            status: "Operational".into(),
            location: Some("Tracy, CA".into()),
            capacity_t_co2_per_year: Some(1_000.0),
            start_date: Some(date(2023, 11, 9)),
            partners: Vec::new(),
        },
        Project {
            id: "prj-stratos".into(),
            org_id: "carbon-engineering".into(),
            name: "Stratos".into(),
            project_type: ProjectType::Commercial,
            stage: Stage::Commercial,
            status: "Under construction".into(),
            location: Some("Ector County, TX".into()),
            capacity_t_co2_per_year: Some(500_000.0),
            start_date: None,
            partners: Vec::new(),
        },
    ];

    let claims = vec![
        Claim {
            id: "clm-cw-energy".into(),
            org_id: "climeworks".into(),
            statement: "Energy use below 2,000 kWh per tonne captured".into(),
            metric: "energy".into(),
            unit: "kWh/t".into(),
            min: Some(1_500.0),
            ml: Some(1_800.0),
            max: Some(2_000.0),
            trust: Trust::Medium,
            rag: Rag::Amber,
            asserted_on: date(2024, 6, 1),
            valid_from: None,
            valid_to: None,
            evidence: vec![Evidence {
                id: "ev-cw-1".into(),
                claim_id: "clm-cw-energy".into(),
                kind: EvidenceKind::Report,
                title: "Gen 3 technology brief".into(),
                url: Some("https://climeworks.com/news/gen-3".into()),
                published_on: Some(date(2024, 6, 1)),
                summary: None,
            }],
        },
        Claim {
            id: "clm-hl-cost".into(),
            org_id: "heirloom".into(),
            statement: "Path to $100 per tonne by 2035".into(),
            metric: "cost".into(),
            unit: "USD/t".into(),
            min: Some(100.0),
            ml: Some(150.0),
            max: Some(250.0),
            trust: Trust::Low,
            rag: Rag::Red,
            asserted_on: date(2023, 3, 14),
            valid_from: None,
            valid_to: None,
            evidence: Vec::new(),
        },
    ];

    let relations = vec![
        Relation {
            id: "rel-cw-cf".into(),
            source_id: "climeworks".into(),
            target_id: "carbfix".into(),
            relation_type: RelationType::Storage,
            description: Some("Basalt storage at Hellisheidi".into()),
            since: Some(date(2017, 10, 11)),
            until: None,
            confidence: Some(Trust::High),
        },
        Relation {
            id: "rel-hl-ms".into(),
            source_id: "heirloom".into(),
            target_id: "microsoft".into(),
            relation_type: RelationType::Offtake,
            description: None,
            since: Some(date(2024, 1, 22)),
            until: None,
            confidence: Some(Trust::Medium),
        },
    ];

    let documents = vec![
        Document {
            id: "doc-cw-mammoth".into(),
            org_id: "climeworks".into(),
            kind: DocumentKind::News,
            title: "Mammoth begins operations".into(),
            url: "https://climeworks.com/news/mammoth".into(),
            published_on: date(2024, 5, 8),
            summary: None,
            source: Some("Climeworks".into()),
        },
        Document {
            id: "doc-hl-patent".into(),
            org_id: "heirloom".into(),
            kind: DocumentKind::Patent,
            title: "Calcination reactor for carbon removal".into(),
            url: "https://patents.example.org/heirloom-1".into(),
            published_on: date(2024, 2, 2),
            summary: None,
            source: None,
        },
        Document {
            id: "doc-ce-paper".into(),
            org_id: "carbon-engineering".into(),
            kind: DocumentKind::Publication,
            title: "A process for capturing CO2 from the atmosphere".into(),
            url: "https://doi.org/10.1016/j.joule.2018.05.006".into(),
            published_on: date(2018, 6, 7),
            summary: None,
            source: Some("Joule".into()),
        },
    ];

    let signals = vec![Signal {
        id: "sig-ce-stale".into(),
        entity_id: "carbon-engineering".into(),
        rag: Rag::Amber,
        message: "Profile not refreshed in 90+ days".into(),
        updated_on: date(2025, 10, 1),
        tags: vec!["staleness".into()],
        source: None,
    }];

    Tables {
        orgs: demo_orgs(),
        projects,
        claims,
        relations,
        documents,
        signals,
        drafts: Vec::new(),
    }
}

use crate::config::{RoleTarget, RolesConfig, SeniorityRank};
use crate::domain::{Company, EnrichmentStatus, Seniority, Stakeholder};
use tracing::debug;
use uuid::Uuid;

/// Resolves candidate stakeholders for an enriched company by matching the
/// configured target-role keywords against contact titles. Keyword lists
/// are ordered: earlier targets win ties, and the first matching seniority
/// rank applies.
pub struct StakeholderResolver {
    targets: Vec<RoleTarget>,
    seniority: Vec<SeniorityRank>,
}

impl StakeholderResolver {
    pub fn new(config: &RolesConfig) -> Self {
        Self {
            targets: config.targets.clone(),
            seniority: config.seniority.clone(),
        }
    }

    /// Zero or more stakeholders for one company. Empty is a valid result.
    /// Only `Enriched` companies carry attributes worth resolving.
    pub fn resolve(&self, company: &Company) -> Vec<Stakeholder> {
        if company.status != EnrichmentStatus::Enriched {
            return Vec::new();
        }

        let contacts = match company.attribute("contacts").and_then(|v| v.as_array()) {
            Some(contacts) => contacts,
            None => return Vec::new(),
        };

        // (seniority rank, target position) pairs drive the final ordering;
        // the stable sort keeps input order for full ties.
        let mut matched: Vec<(u8, usize, Stakeholder)> = Vec::new();

        for contact in contacts {
            let name = contact.get("name").and_then(|v| v.as_str());
            let title = contact.get("title").and_then(|v| v.as_str());
            let (name, title) = match (name, title) {
                (Some(n), Some(t)) => (n, t),
                _ => {
                    debug!("Ignoring contact without name/title for {}", company.id);
                    continue;
                }
            };
            let title_lower = title.to_lowercase();

            let target = self
                .targets
                .iter()
                .enumerate()
                .find(|(_, t)| title_lower.contains(&t.keyword.to_lowercase()));
            let (target_index, target) = match target {
                Some(hit) => hit,
                None => continue,
            };

            let seniority = self.seniority_for(&title_lower);
            let id = Uuid::new_v5(
                &Uuid::NAMESPACE_URL,
                format!("{}|{}|{}", company.id, name, title).as_bytes(),
            );

            matched.push((
                seniority.rank(),
                target_index,
                Stakeholder {
                    id,
                    company_id: company.id.clone(),
                    name: name.to_string(),
                    title: title.to_string(),
                    seniority,
                    function: target.function.clone(),
                },
            ));
        }

        matched.sort_by_key(|(rank, target_index, _)| (*rank, *target_index));
        matched.into_iter().map(|(_, _, s)| s).collect()
    }

    fn seniority_for(&self, title_lower: &str) -> Seniority {
        for rank in &self.seniority {
            if rank
                .keywords
                .iter()
                .any(|k| title_lower.contains(&k.to_lowercase()))
            {
                return rank.tier;
            }
        }
        Seniority::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{company_from_record, RawCompanyRecord, RawContact};

    fn enriched_company(contacts: Vec<RawContact>) -> Company {
        let record = RawCompanyRecord {
            name: Some("Acme Signs".to_string()),
            event: None,
            industry: None,
            description: None,
            website: None,
            booth: None,
            employees: None,
            engagement: None,
            contacts,
        };
        let mut company = company_from_record(&record, "Expo").unwrap();
        company.status = EnrichmentStatus::Enriched;
        company
    }

    fn contact(name: &str, title: &str) -> RawContact {
        RawContact {
            name: name.to_string(),
            title: title.to_string(),
        }
    }

    fn resolver() -> StakeholderResolver {
        StakeholderResolver::new(&RolesConfig::default())
    }

    #[test]
    fn resolves_seniority_and_function_from_title() {
        let company = enriched_company(vec![
            contact("Ada Boyd", "VP of Product Development"),
            contact("Ben Cruz", "Purchasing Manager"),
            contact("Cal Drew", "Marketing Specialist"),
        ]);

        let stakeholders = resolver().resolve(&company);
        assert_eq!(stakeholders.len(), 3);

        let ada = stakeholders.iter().find(|s| s.name == "Ada Boyd").unwrap();
        assert_eq!(ada.seniority, Seniority::Executive);
        assert_eq!(ada.function, "product_development");

        let ben = stakeholders.iter().find(|s| s.name == "Ben Cruz").unwrap();
        assert_eq!(ben.seniority, Seniority::Manager);
        assert_eq!(ben.function, "procurement");

        let cal = stakeholders.iter().find(|s| s.name == "Cal Drew").unwrap();
        assert_eq!(cal.seniority, Seniority::Specialist);
        assert_eq!(cal.function, "marketing");
    }

    #[test]
    fn orders_by_seniority_then_keyword_position() {
        let company = enriched_company(vec![
            contact("Low", "Marketing Specialist"),
            contact("MarketingDir", "Director of Marketing"),
            contact("ProcurementDir", "Director of Procurement"),
        ]);

        let stakeholders = resolver().resolve(&company);
        let names: Vec<&str> = stakeholders.iter().map(|s| s.name.as_str()).collect();
        // Both directors outrank the specialist; "procurement" appears
        // earlier in the target list than "marketing".
        assert_eq!(names, vec!["ProcurementDir", "MarketingDir", "Low"]);
    }

    #[test]
    fn titles_without_target_keywords_are_skipped() {
        let company = enriched_company(vec![
            contact("Dana", "Office Administrator"),
            contact("Eli", "Director of Procurement"),
        ]);

        let stakeholders = resolver().resolve(&company);
        assert_eq!(stakeholders.len(), 1);
        assert_eq!(stakeholders[0].name, "Eli");
    }

    #[test]
    fn no_contacts_is_a_valid_empty_result() {
        let company = enriched_company(Vec::new());
        assert!(resolver().resolve(&company).is_empty());
    }

    #[test]
    fn non_enriched_companies_resolve_to_nothing() {
        let mut company = enriched_company(vec![contact("Eli", "Director of Procurement")]);
        company.status = EnrichmentStatus::EnrichmentFailed;
        assert!(resolver().resolve(&company).is_empty());
    }

    #[test]
    fn stakeholder_ids_are_deterministic() {
        let company = enriched_company(vec![contact("Eli", "Director of Procurement")]);
        let first = resolver().resolve(&company);
        let second = resolver().resolve(&company);
        assert_eq!(first[0].id, second[0].id);
    }
}

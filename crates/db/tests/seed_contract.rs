use draftdesk_db::SampleDirectory;
use serde::Deserialize;
use std::collections::HashSet;

type SeedContractTestResult<T = ()> = Result<T, String>;

macro_rules! require {
    ($cond:expr) => {
        if !$cond {
            return Err(format!("assertion failed: `{}`", stringify!($cond)));
        }
    };
    ($cond:expr, $($arg:tt)*) => {
        if !$cond {
            return Err(format!($($arg)*));
        }
    };
}

macro_rules! require_eq {
    ($left:expr, $right:expr) => {
        if $left != $right {
            return Err(format!(
                "assertion failed: `left == right` (`{:?}` != `{:?}`)",
                $left,
                $right
            ));
        }
    };
}

#[derive(Debug, Deserialize)]
struct ContactContract {
    name: String,
    email: String,
}

#[derive(Debug, Deserialize)]
struct PolicyContract {
    source: String,
    verbatim_phrases: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SeedContract {
    dataset_version: String,
    contacts: Vec<ContactContract>,
    policy_document: PolicyContract,
}

fn load_contract() -> SeedContractTestResult<SeedContract> {
    serde_json::from_str(include_str!("../../../config/fixtures/sample_directory_contract.json"))
        .map_err(|error| format!("seed contract JSON must parse: {error}"))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[test]
fn seed_contract_matches_sample_directory_sql_fixture() -> SeedContractTestResult {
    let fixture_sql = SampleDirectory::SQL;
    let contract = load_contract()?;
    let mut names_seen = HashSet::new();

    require_eq!(contract.dataset_version, "sample-directory-v1");
    require!(!contract.contacts.is_empty());

    for contact in &contract.contacts {
        require!(
            names_seen.insert(contact.name.to_lowercase()),
            "duplicate contact name: {}",
            contact.name
        );
        require!(
            fixture_sql.contains(&format!("('{}', '{}')", contact.name, contact.email)),
            "seed SQL fixture should insert {} <{}>",
            contact.name,
            contact.email
        );
    }

    Ok(())
}

#[test]
fn seed_contract_matches_rust_sample_contacts() -> SeedContractTestResult {
    let contract = load_contract()?;
    let rust_contacts = SampleDirectory::contacts();

    require_eq!(contract.contacts.len(), rust_contacts.len());
    for (expected, actual) in contract.contacts.iter().zip(&rust_contacts) {
        require_eq!(expected.name, actual.name);
        require_eq!(expected.email, actual.email);
    }

    let ashu = rust_contacts
        .iter()
        .find(|contact| contact.name == "Ashu")
        .ok_or_else(|| "sample directory should contain Ashu".to_string())?;
    require_eq!(ashu.email, "ashu.kumar@oracle.com");

    Ok(())
}

#[test]
fn policy_phrases_appear_verbatim_in_sample_policy() -> SeedContractTestResult {
    let contract = load_contract()?;
    let policy = collapse_whitespace(SampleDirectory::POLICY_TEXT);

    require_eq!(contract.policy_document.source, SampleDirectory::POLICY_SOURCE);
    require!(!contract.policy_document.verbatim_phrases.is_empty());
    for phrase in &contract.policy_document.verbatim_phrases {
        require!(policy.contains(phrase.as_str()), "policy should contain `{}`", phrase);
    }

    Ok(())
}

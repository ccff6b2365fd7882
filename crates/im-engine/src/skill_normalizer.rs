use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;
use strsim::damerau_levenshtein;
use unicode_normalization::UnicodeNormalization;

/// Canonical skill tokens, ordering-irrelevant and deduplicated.
///
/// A `BTreeSet` keeps iteration order deterministic, which the pipeline
/// relies on when emitting `matching_skills` / `missing_skills`.
pub type SkillSet = BTreeSet<String>;

/// Skill alias → canonical form (O(1) lookup).
///
/// Open vocabulary: tokens not in this table pass through unchanged after
/// normalization. The `sql` family is collapsed to `sql` because that is the
/// token the marketplace UI displays for database skills.
static ALIAS_TO_CANONICAL: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    let aliases: &[(&str, &[&str])] = &[
        // Languages
        (
            "javascript",
            &["js", "javascript", "java script", "ecmascript", "es6", "es2015"],
        ),
        ("typescript", &["ts", "typescript", "type script"]),
        ("python", &["python3", "python 3", "py", "python"]),
        ("java", &["java8", "java11", "java17", "openjdk", "java"]),
        ("csharp", &["c#", "c sharp", "csharp", ".net", "dotnet"]),
        ("cplusplus", &["c++", "cpp", "c plus plus"]),
        ("golang", &["go", "golang", "go lang"]),
        ("rust", &["rust lang", "rust language", "rust"]),
        ("ruby", &["ruby lang", "ruby on rails", "rails", "ruby"]),
        ("php", &["php7", "php8", "php"]),
        ("kotlin", &["kotlin lang", "kotlin jvm", "kotlin"]),
        ("swift", &["swift lang", "ios swift", "swift"]),
        // Frontend
        (
            "react",
            &["reactjs", "react.js", "react js", "react", "react18"],
        ),
        ("vue", &["vue.js", "vuejs", "vue js", "vue", "vue3"]),
        ("angular", &["angularjs", "angular.js", "angular", "angular2"]),
        ("nextjs", &["next.js", "nextjs", "next js"]),
        ("svelte", &["sveltejs", "svelte.js", "svelte"]),
        ("html", &["html5", "html"]),
        ("css", &["css", "css3", "cascading style sheets"]),
        ("tailwind", &["tailwindcss", "tailwind css", "tailwind"]),
        ("bootstrap", &["bootstrap", "bootstrap4", "bootstrap5"]),
        // Backend frameworks
        ("nodejs", &["node.js", "node js", "nodejs", "node"]),
        (
            "express",
            &["express.js", "expressjs", "express js", "express"],
        ),
        ("django", &["django rest framework", "drf", "django"]),
        ("flask", &["flask framework", "python flask", "flask"]),
        ("fastapi", &["fast api", "fastapi framework", "fastapi"]),
        ("spring", &["spring boot", "springboot", "spring framework", "spring"]),
        ("laravel", &["laravel framework", "php laravel", "laravel"]),
        // Databases: the UI vocabulary treats these as one `sql` skill.
        (
            "sql",
            &[
                "sql", "mysql", "my sql", "postgres", "postgresql", "postgre sql", "mariadb",
                "sqlite", "sqlite3", "mssql", "sql server",
            ],
        ),
        ("mongodb", &["mongo", "mongo db", "mongodb", "nosql"]),
        ("redis", &["redis cache", "redis db", "redis"]),
        ("elasticsearch", &["elastic search", "elasticsearch"]),
        // Cloud / DevOps
        ("aws", &["amazon web services", "amazon aws", "aws cloud", "aws"]),
        ("gcp", &["google cloud platform", "google cloud", "gcp"]),
        ("azure", &["microsoft azure", "ms azure", "azure cloud", "azure"]),
        ("docker", &["containerization", "docker container", "docker"]),
        ("kubernetes", &["k8s", "kube", "kubernetes"]),
        ("terraform", &["infrastructure as code", "iac", "terraform"]),
        ("git", &["version control", "git scm", "github", "gitlab", "git"]),
        ("linux", &["gnu/linux", "ubuntu", "linux"]),
        ("cicd", &["ci/cd", "ci cd", "continuous integration", "cicd"]),
        // Data / ML
        (
            "machinelearning",
            &["machine learning", "ml", "machinelearning"],
        ),
        (
            "deeplearning",
            &["deep learning", "neural networks", "deeplearning"],
        ),
        ("nlp", &["natural language processing", "nlp"]),
        ("tensorflow", &["tensor flow", "tf", "tensorflow"]),
        ("pytorch", &["torch", "py torch", "pytorch"]),
        ("pandas", &["python pandas", "pandas"]),
        ("numpy", &["numerical python", "numpy"]),
        ("excel", &["microsoft excel", "ms excel", "excel"]),
        ("powerbi", &["power bi", "powerbi"]),
        ("tableau", &["tableau desktop", "tableau"]),
        // Mobile
        ("reactnative", &["react native", "react-native", "reactnative"]),
        ("flutter", &["flutter framework", "dart flutter", "flutter"]),
        ("android", &["android development", "android studio", "android"]),
        ("ios", &["ios development", "ios"]),
        // Design / product
        ("figma", &["figma design", "figma"]),
        ("uiux", &["ui/ux", "ui ux", "ux design", "ui design", "uiux"]),
        // Testing
        ("selenium", &["selenium webdriver", "selenium testing", "selenium"]),
        ("jest", &["jest testing", "jest framework", "jest"]),
        ("pytest", &["python testing", "py test", "pytest"]),
        ("cypress", &["cypress testing", "e2e testing", "cypress"]),
        // APIs
        ("rest", &["rest api", "restful", "rest apis", "rest"]),
        ("graphql", &["graph ql", "graphql"]),
    ];

    let mut map = HashMap::new();
    for (canonical, alias_list) in aliases {
        map.insert(*canonical, *canonical);
        for alias in *alias_list {
            map.insert(*alias, *canonical);
        }
    }
    map
});

/// Compact keys (separator characters removed) for tolerating minor spelling
/// variants like "react-js" or "node_js" without enumerating every form.
static COMPACT_ALIAS_TO_CANONICAL: LazyLock<HashMap<String, &'static str>> = LazyLock::new(|| {
    let mut map = HashMap::new();
    for (alias, canonical) in ALIAS_TO_CANONICAL.iter() {
        map.entry(compact_key(alias)).or_insert(*canonical);
    }
    map
});

fn nfkc_lower_trim(input: &str) -> String {
    input.nfkc().collect::<String>().trim().to_lowercase()
}

fn compact_key(input: &str) -> String {
    input
        .nfkc()
        .collect::<String>()
        .to_lowercase()
        .chars()
        .filter(|c| !matches!(c, ' ' | '.' | '-' | '_' | '/' | ','))
        .collect()
}

/// Surrounding punctuation stripped from unknown tokens. `#` and `+` stay;
/// they are significant in language names handled by the alias table.
fn strip_outer_punctuation(token: &str) -> &str {
    token.trim_matches(|c: char| {
        matches!(c, '.' | ',' | ';' | ':' | '!' | '?' | '(' | ')' | '[' | ']' | '"' | '\'')
    })
}

fn match_canonical_token(token: &str) -> Option<String> {
    if token.is_empty() {
        return None;
    }

    if let Some(canonical) = ALIAS_TO_CANONICAL.get(token) {
        return Some((*canonical).to_string());
    }

    let compact = compact_key(token);
    if let Some(canonical) = COMPACT_ALIAS_TO_CANONICAL.get(&compact) {
        return Some((*canonical).to_string());
    }

    fuzzy_match_canonical(&compact)
}

fn split_segments(input: &str) -> impl Iterator<Item = String> + '_ {
    input
        .split(|c: char| matches!(c, ' ' | '\u{3000}' | '/' | '／' | ',' | ';' | '|' | '&'))
        .map(nfkc_lower_trim)
        .filter(|s| !s.is_empty())
}

fn fuzzy_match_canonical(compact: &str) -> Option<String> {
    if compact.len() < 4 {
        return None;
    }

    let mut best: Option<(&str, usize)> = None;
    for (alias, canonical) in COMPACT_ALIAS_TO_CANONICAL.iter() {
        // Short aliases and short canonical targets are exact-match only;
        // fuzzing them produces false positives on brief inputs.
        if alias.len() < 5 || compact.len() < 5 || canonical.len() < 5 {
            continue;
        }

        let distance = damerau_levenshtein(compact, alias);
        if distance == 0 {
            return Some((*canonical).to_string());
        }

        let len = compact.len().max(alias.len());
        let acceptable = distance == 1 || (len >= 8 && distance == 2);
        if !acceptable {
            continue;
        }

        match best {
            None => best = Some((*canonical, distance)),
            Some((_, best_dist)) if distance < best_dist => best = Some((*canonical, distance)),
            _ => {}
        }
    }

    best.map(|(canonical, _)| canonical.to_string())
}

/// Canonicalize one skill string.
///
/// Lookup order: exact alias, compact-key alias, Damerau-Levenshtein fuzzy
/// fallback, then per-segment retry for composite inputs like
/// "Python / Django". Unknown tokens pass through lower-cased and trimmed.
pub fn normalize_skill(skill: &str) -> String {
    let normalized = nfkc_lower_trim(skill);
    if let Some(canonical) = match_canonical_token(&normalized) {
        return canonical;
    }

    for segment in split_segments(skill) {
        if let Some(canonical) = match_canonical_token(&segment) {
            return canonical;
        }
    }

    strip_outer_punctuation(&normalized).to_string()
}

/// Normalize a list of raw skill strings into a canonical `SkillSet`.
pub fn normalize_skill_set(skills: &[String]) -> SkillSet {
    skills
        .iter()
        .map(|s| normalize_skill(s))
        .filter(|s| !s.is_empty())
        .collect()
}

/// Normalize comma/semicolon-delimited free text ("React, SQL; docker") into
/// a canonical `SkillSet`. Empty input yields an empty set, never an error.
pub fn normalize_free_text(raw: &str) -> SkillSet {
    raw.split(|c: char| matches!(c, ',' | ';' | '\n'))
        .map(normalize_skill)
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_and_alias_equivalence() {
        assert_eq!(normalize_skill("JavaScript"), "javascript");
        assert_eq!(normalize_skill("js"), "javascript");
        assert_eq!(normalize_skill("ReactJS"), "react");
        assert_eq!(normalize_skill("K8s"), "kubernetes");
        assert_eq!(normalize_skill("C#"), "csharp");
    }

    #[test]
    fn sql_family_collapses_to_sql() {
        assert_eq!(normalize_skill("Postgres"), "sql");
        assert_eq!(normalize_skill("MySQL"), "sql");
        assert_eq!(normalize_skill("SQLite3"), "sql");
        assert_eq!(normalize_skill("sql"), "sql");
    }

    #[test]
    fn normalizes_separator_variants() {
        assert_eq!(normalize_skill("React　JS"), "react");
        assert_eq!(normalize_skill("node_js"), "nodejs");
        assert_eq!(normalize_skill("Python／Django"), "python");
    }

    #[test]
    fn tolerates_small_typos_for_known_aliases() {
        assert_eq!(normalize_skill("javascirpt"), "javascript");
        assert_eq!(normalize_skill("pytroch"), "pytorch");
        assert_eq!(normalize_skill("kuberntes"), "kubernetes");
    }

    #[test]
    fn does_not_fuzz_short_tokens() {
        assert_eq!(normalize_skill("ab"), "ab");
        assert_eq!(normalize_skill("javaa"), "javaa");
        assert_eq!(normalize_skill("rustt"), "rustt");
    }

    #[test]
    fn unknown_skill_passes_through_lowercased() {
        assert_eq!(normalize_skill("MyCustomFramework"), "mycustomframework");
        assert_eq!(normalize_skill("  Verilog.  "), "verilog");
    }

    #[test]
    fn free_text_splits_on_commas_and_semicolons() {
        let set = normalize_free_text("React, SQL; docker,, ");
        let expected: SkillSet = ["react", "sql", "docker"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(set, expected);
    }

    #[test]
    fn empty_input_yields_empty_set() {
        assert!(normalize_free_text("").is_empty());
        assert!(normalize_free_text("  ;  , ").is_empty());
        assert!(normalize_skill_set(&[]).is_empty());
    }

    #[test]
    fn bidirectional_normalization_agrees() {
        let posting = normalize_skill_set(&["React.js".to_string(), "K8s".to_string()]);
        let profile = normalize_skill_set(&["react".to_string(), "kubernetes".to_string()]);
        assert_eq!(posting, profile);
    }

    #[test]
    fn skill_set_dedupes() {
        let set = normalize_skill_set(&[
            "Python".to_string(),
            "python3".to_string(),
            "py".to_string(),
        ]);
        assert_eq!(set.len(), 1);
        assert!(set.contains("python"));
    }
}

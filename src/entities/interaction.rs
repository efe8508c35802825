use std::collections::HashSet;

use futures::future::join_all;
use minijinja::context;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::ai::{AiGateway, ChatMessage, CompletionRequest, parse_json_object, prompts};
use crate::entities::localized::{Language, LocalizedList, LocalizedText};
use crate::error::PharmaError;
use crate::resolve;
use crate::sanitize::{INTERACTION_RESULT, sanitize_into};
use crate::sources::openfda::{LabelQuery, LabelRecord, OpenFdaClient};
use crate::transform;
use crate::utils::text::{normalize_name, truncate_chars};

pub const MIN_DRUGS: usize = 2;
pub const MAX_DRUGS: usize = 10;
const SECTION_BUDGET_CHARS: usize = 1500;

/// Closed severity vocabulary. Every provider and fallback output is
/// normalized into it before leaving this module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Severity {
    Critical,
    Moderate,
    Minor,
    #[default]
    Unknown,
    Error,
}

impl Severity {
    pub fn normalize(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "critical" | "high" | "severe" | "major" | "contraindicated" => Self::Critical,
            "moderate" | "medium" => Self::Moderate,
            "minor" | "safe" | "none" | "low" | "mild" => Self::Minor,
            "error" => Self::Error,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::Moderate => "moderate",
            Self::Minor => "minor",
            Self::Unknown => "unknown",
            Self::Error => "error",
        }
    }

    fn rank(self) -> u8 {
        match self {
            Self::Critical => 3,
            Self::Moderate => 2,
            Self::Minor => 1,
            Self::Unknown | Self::Error => 0,
        }
    }
}

impl From<String> for Severity {
    fn from(value: String) -> Self {
        Self::normalize(&value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interaction {
    pub severity: Severity,
    pub title: LocalizedText,
    pub description: LocalizedText,
    pub recommendations: LocalizedList,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionResult {
    pub interactions: Vec<Interaction>,
    pub overall_risk: Severity,
    pub summary: LocalizedText,
    #[serde(default)]
    pub disclaimer: LocalizedText,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionRequest {
    #[serde(default)]
    pub drugs: Vec<String>,
    #[serde(default)]
    pub language: Language,
}

pub fn disclaimer() -> LocalizedText {
    LocalizedText::text(
        "This information is for reference only and does not replace advice from a doctor or pharmacist.",
        "هذه المعلومات للاستئناس فقط ولا تغني عن استشارة الطبيب أو الصيدلي.",
        "ئەم زانیارییانە تەنها بۆ ئاگادارییە و جێگەی ڕاوێژی پزیشک یان دەرمانساز ناگرێتەوە.",
    )
}

fn result(interactions: Vec<Interaction>, overall_risk: Severity, summary: LocalizedText) -> InteractionResult {
    InteractionResult {
        interactions,
        overall_risk,
        summary,
        disclaimer: disclaimer(),
    }
}

fn max_severity(interactions: &[Interaction]) -> Option<Severity> {
    interactions
        .iter()
        .map(|i| i.severity)
        .max_by_key(|s| s.rank())
}

// ---- static fallback rules ----

const NSAIDS: &[&str] = &[
    "aspirin", "ibuprofen", "naproxen", "diclofenac", "celecoxib", "meloxicam", "indomethacin",
    "ketorolac", "ketoprofen", "piroxicam", "etodolac", "nabumetone", "advil", "motrin", "aleve",
    "nurofen", "voltaren", "cataflam",
];
const ANTICOAGULANTS: &[&str] = &[
    "warfarin", "coumadin", "jantoven", "heparin", "enoxaparin", "lovenox", "apixaban", "eliquis",
    "rivaroxaban", "xarelto", "dabigatran", "pradaxa", "edoxaban", "clopidogrel", "plavix",
    "prasugrel", "ticagrelor", "brilinta",
];
const BENZODIAZEPINES: &[&str] = &[
    "diazepam", "lorazepam", "alprazolam", "clonazepam", "temazepam", "midazolam",
    "chlordiazepoxide", "valium", "xanax", "ativan", "klonopin",
];
const OPIOIDS: &[&str] = &[
    "morphine", "codeine", "oxycodone", "hydrocodone", "tramadol", "fentanyl", "methadone",
    "hydromorphone", "tapentadol", "buprenorphine", "oxycontin", "percocet", "vicodin",
];
const STATINS: &[&str] = &[
    "simvastatin", "atorvastatin", "lovastatin", "rosuvastatin", "pravastatin", "fluvastatin",
    "zocor", "lipitor", "crestor",
];
const MACROLIDES: &[&str] = &["clarithromycin", "erythromycin", "telithromycin", "biaxin"];
const SSRIS: &[&str] = &[
    "sertraline", "fluoxetine", "citalopram", "escitalopram", "paroxetine", "fluvoxamine",
    "zoloft", "prozac", "lexapro", "celexa", "paxil",
];
const ACE_ARBS: &[&str] = &[
    "lisinopril", "ramipril", "enalapril", "benazepril", "captopril", "perindopril", "losartan",
    "valsartan", "irbesartan", "candesartan", "olmesartan", "telmisartan",
];

struct Rule {
    first: &'static [&'static str],
    second: &'static [&'static str],
    severity: Severity,
    title: [&'static str; 3],
    description: [&'static str; 3],
    recommendation: [&'static str; 3],
}

// Checked in order; the first matching rule wins for a pair.
const RULES: &[Rule] = &[
    Rule {
        first: NSAIDS,
        second: ANTICOAGULANTS,
        severity: Severity::Critical,
        title: ["Increased bleeding risk", "زيادة خطر النزيف", "زیادبوونی مەترسی خوێنبەربوون"],
        description: [
            "NSAIDs combined with anticoagulant or antiplatelet drugs significantly increase the risk of serious bleeding, including stomach bleeding.",
            "يؤدي الجمع بين مضادات الالتهاب غير الستيرويدية ومضادات التخثر أو الصفائح إلى زيادة كبيرة في خطر النزيف الخطير، بما في ذلك نزيف المعدة.",
            "بەکارهێنانی دەرمانی دژە هەوکردن لەگەڵ دەرمانی دژە مەیین مەترسی خوێنبەربوونی گەورە زیاد دەکات، لەوانە خوێنبەربوونی گەدە.",
        ],
        recommendation: [
            "Avoid this combination unless a doctor prescribed it and monitors you.",
            "تجنب هذا الجمع إلا إذا وصفه الطبيب ويتابعك.",
            "خۆت لەم تێکەڵەیە بپارێزە مەگەر پزیشک نووسیبێتی و چاودێریت بکات.",
        ],
    },
    Rule {
        first: BENZODIAZEPINES,
        second: OPIOIDS,
        severity: Severity::Critical,
        title: ["Dangerous sedation and slowed breathing", "تخدير خطير وتباطؤ التنفس", "خەواندنی مەترسیدار و خاوبوونەوەی هەناسە"],
        description: [
            "Benzodiazepines taken with opioids can cause profound sedation, respiratory depression, coma and death.",
            "قد يؤدي تناول البنزوديازيبينات مع الأفيونات إلى تخدير شديد وتثبيط التنفس وغيبوبة ووفاة.",
            "بەکارهێنانی بێنزۆدیازێپین لەگەڵ ئۆپیۆید دەتوانێت ببێتە هۆی خەوی قووڵ، لاوازبوونی هەناسە، کۆما و مردن.",
        ],
        recommendation: [
            "Do not combine without explicit medical supervision.",
            "لا تجمع بينهما دون إشراف طبي صريح.",
            "بەبێ چاودێری ڕاستەوخۆی پزیشک تێکەڵیان مەکە.",
        ],
    },
    Rule {
        first: STATINS,
        second: MACROLIDES,
        severity: Severity::Critical,
        title: ["Risk of muscle damage", "خطر تلف العضلات", "مەترسی زیانگەیاندن بە ماسولکە"],
        description: [
            "Some macrolide antibiotics raise statin levels in the blood, increasing the risk of myopathy and rhabdomyolysis.",
            "ترفع بعض المضادات الحيوية الماكروليدية مستوى الستاتين في الدم مما يزيد خطر اعتلال العضلات وانحلال الربيدات.",
            "هەندێک دژەبەکتریای ماکرۆلاید ئاستی ستاتین لە خوێندا بەرز دەکەنەوە و مەترسی نەخۆشی ماسولکە زیاد دەکەن.",
        ],
        recommendation: [
            "Ask your doctor whether to pause the statin during the antibiotic course.",
            "اسأل طبيبك عما إذا كان يجب إيقاف الستاتين مؤقتاً أثناء المضاد الحيوي.",
            "لە پزیشکەکەت بپرسە ئایا ستاتین لە ماوەی دژەبەکتریاکەدا ڕابگیرێت.",
        ],
    },
    Rule {
        first: SSRIS,
        second: NSAIDS,
        severity: Severity::Moderate,
        title: ["Increased bleeding risk", "زيادة خطر النزيف", "زیادبوونی مەترسی خوێنبەربوون"],
        description: [
            "SSRI antidepressants combined with NSAIDs increase the risk of gastrointestinal bleeding.",
            "يزيد الجمع بين مضادات الاكتئاب SSRI ومضادات الالتهاب غير الستيرويدية من خطر نزيف الجهاز الهضمي.",
            "دژە خەمۆکی SSRI لەگەڵ دەرمانی دژە هەوکردن مەترسی خوێنبەربوونی کۆئەندامی هەرس زیاد دەکات.",
        ],
        recommendation: [
            "Use the lowest effective dose and watch for signs of bleeding.",
            "استخدم أقل جرعة فعالة وراقب علامات النزيف.",
            "کەمترین ژەمی کاریگەر بەکاربهێنە و ئاگاداری نیشانەکانی خوێنبەربوون بە.",
        ],
    },
    Rule {
        first: SSRIS,
        second: ANTICOAGULANTS,
        severity: Severity::Moderate,
        title: ["Increased bleeding risk", "زيادة خطر النزيف", "زیادبوونی مەترسی خوێنبەربوون"],
        description: [
            "SSRI antidepressants can add to the bleeding effect of anticoagulant and antiplatelet drugs.",
            "قد تزيد مضادات الاكتئاب SSRI من تأثير مضادات التخثر والصفائح على النزيف.",
            "دژە خەمۆکی SSRI دەتوانێت کاریگەری خوێنبەربوونی دەرمانی دژە مەیین زیاد بکات.",
        ],
        recommendation: [
            "Your doctor may need to monitor clotting more closely.",
            "قد يحتاج طبيبك إلى مراقبة التخثر عن كثب.",
            "لەوانەیە پزیشکەکەت پێویستی بە چاودێری زیاتری مەیینی خوێن هەبێت.",
        ],
    },
    Rule {
        first: ACE_ARBS,
        second: NSAIDS,
        severity: Severity::Moderate,
        title: ["Reduced blood pressure control and kidney strain", "ضعف السيطرة على ضغط الدم وإجهاد الكلى", "کەمبوونەوەی کۆنترۆڵی پەستانی خوێن و ماندووبوونی گورچیلە"],
        description: [
            "NSAIDs can blunt the effect of ACE inhibitors and ARBs and together they may harm kidney function.",
            "قد تضعف مضادات الالتهاب غير الستيرويدية تأثير مثبطات الإنزيم المحول وحاصرات الأنجيوتنسين وقد تضر معاً بوظائف الكلى.",
            "دەرمانی دژە هەوکردن دەتوانێت کاریگەری دەرمانی پەستانی خوێن کەم بکاتەوە و پێکەوە زیان بە گورچیلە بگەیەنن.",
        ],
        recommendation: [
            "Limit NSAID use and have blood pressure and kidney function checked.",
            "قلل استخدام مضادات الالتهاب وافحص ضغط الدم ووظائف الكلى.",
            "بەکارهێنانی دەرمانی دژە هەوکردن کەم بکەرەوە و پەستانی خوێن و گورچیلە بپشکنە.",
        ],
    },
    Rule {
        first: NSAIDS,
        second: NSAIDS,
        severity: Severity::Moderate,
        title: ["Duplicate NSAID therapy", "ازدواجية مضادات الالتهاب", "دووبارەبوونەوەی دەرمانی دژە هەوکردن"],
        description: [
            "Taking two NSAIDs together adds stomach, kidney and bleeding risks without extra benefit.",
            "تناول مضادين للالتهاب معاً يزيد مخاطر المعدة والكلى والنزيف دون فائدة إضافية.",
            "بەکارهێنانی دوو دەرمانی دژە هەوکردن پێکەوە مەترسی گەدە و گورچیلە و خوێنبەربوون زیاد دەکات بەبێ سوودی زیاتر.",
        ],
        recommendation: [
            "Use only one NSAID at a time unless a doctor advises otherwise.",
            "استخدم مضاد التهاب واحداً فقط في كل مرة ما لم ينصح الطبيب بغير ذلك.",
            "لە یەک کاتدا تەنها یەک دەرمانی دژە هەوکردن بەکاربهێنە مەگەر پزیشک شتێکی تر بڵێت.",
        ],
    },
];

/// Requested name plus label brand/generic names, lowercased.
#[derive(Debug, Clone)]
pub(crate) struct DrugLabel {
    pub requested: String,
    pub record: Option<LabelRecord>,
}

impl DrugLabel {
    fn terms(&self) -> Vec<String> {
        let mut terms = vec![self.requested.to_lowercase()];
        if let Some(record) = &self.record {
            terms.extend(transform::label::known_names(record));
        }
        terms
    }

    fn display(&self) -> String {
        self.record
            .as_ref()
            .and_then(|r| {
                transform::label::brand_name(r).or_else(|| transform::label::generic_name(r))
            })
            .unwrap_or_else(|| self.requested.clone())
    }
}

fn in_class(terms: &[String], class: &[&str]) -> bool {
    terms
        .iter()
        .any(|term| class.iter().any(|keyword| term.contains(keyword)))
}

fn localized_pair(names: &str, parts: [&str; 3]) -> LocalizedText {
    LocalizedText::new(
        format!("{names}: {}", parts[0]),
        format!("{names}: {}", parts[1]),
        format!("{names}: {}", parts[2]),
    )
}

pub(crate) fn rule_interactions(drugs: &[DrugLabel]) -> Vec<Interaction> {
    let mut found = Vec::new();
    for (i, a) in drugs.iter().enumerate() {
        for b in &drugs[i + 1..] {
            let (ta, tb) = (a.terms(), b.terms());
            let hit = RULES.iter().find(|rule| {
                (in_class(&ta, rule.first) && in_class(&tb, rule.second))
                    || (in_class(&ta, rule.second) && in_class(&tb, rule.first))
            });
            if let Some(rule) = hit {
                let names = format!("{} + {}", a.display(), b.display());
                found.push(Interaction {
                    severity: rule.severity,
                    title: localized_pair(&names, rule.title),
                    description: LocalizedText::text(
                        rule.description[0],
                        rule.description[1],
                        rule.description[2],
                    ),
                    recommendations: LocalizedList::single(
                        rule.recommendation[0],
                        rule.recommendation[1],
                        rule.recommendation[2],
                    ),
                });
            }
        }
    }
    found
}

fn fallback_result(drugs: &[DrugLabel]) -> InteractionResult {
    let interactions = rule_interactions(drugs);
    match max_severity(&interactions) {
        Some(risk) => result(
            interactions,
            risk,
            LocalizedText::text(
                "AI analysis is unavailable. Showing known interaction rules for these drugs.",
                "تحليل الذكاء الاصطناعي غير متوفر. نعرض قواعد التفاعل المعروفة لهذه الأدوية.",
                "شیکاری زیرەکی دەستکرد بەردەست نییە. یاساکانی کارلێکی ناسراو بۆ ئەم دەرمانانە پیشان دەدرێن.",
            ),
        ),
        None => result(
            Vec::new(),
            Severity::Unknown,
            LocalizedText::text(
                "AI analysis is unavailable and no known interaction rule matched. Please consult a pharmacist.",
                "تحليل الذكاء الاصطناعي غير متوفر ولم تتطابق أي قاعدة تفاعل معروفة. يرجى استشارة الصيدلي.",
                "شیکاری زیرەکی دەستکرد بەردەست نییە و هیچ یاسایەکی کارلێکی ناسراو نەگونجا. تکایە ڕاوێژ بە دەرمانساز بکە.",
            ),
        ),
    }
}

fn too_few_drugs() -> InteractionResult {
    result(
        Vec::new(),
        Severity::Unknown,
        LocalizedText::text(
            "Please select at least two drugs to check interactions.",
            "يرجى اختيار دوائين على الأقل للتحقق من التفاعلات.",
            "تکایە لانیکەم دوو دەرمان هەڵبژێرە بۆ پشکنینی کارلێکردن.",
        ),
    )
}

fn insufficient_data(missing: &[String]) -> InteractionResult {
    let names = missing.join(", ");
    result(
        Vec::new(),
        Severity::Unknown,
        LocalizedText::new(
            format!("Not enough FDA label data to check interactions. No label found for: {names}."),
            format!("لا توجد بيانات FDA كافية للتحقق من التفاعلات. لم يتم العثور على نشرة لـ: {names}."),
            format!("زانیاری FDA بەس نییە بۆ پشکنینی کارلێک. هیچ نامیلکەیەک نەدۆزرایەوە بۆ: {names}."),
        ),
    )
}

/// Trims, drops blanks and case-insensitive duplicates, keeps input order.
pub(crate) fn dedupe_names(drugs: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    drugs
        .iter()
        .map(|d| d.trim())
        .filter(|d| !d.is_empty())
        .filter(|d| seen.insert(normalize_name(d)))
        .map(str::to_string)
        .take(MAX_DRUGS)
        .collect()
}

async fn fetch_drug(labels: &OpenFdaClient, name: String) -> DrugLabel {
    let mut records = labels
        .fetch_labels(&LabelQuery::Exact(name.clone()), 1)
        .await;
    if records.is_empty()
        && let Some(us_name) = resolve::resolve(&name)
        && us_name != normalize_name(&name)
    {
        records = labels
            .fetch_labels(&LabelQuery::Exact(us_name.to_string()), 1)
            .await;
    }
    DrugLabel {
        requested: name,
        record: records.into_iter().next(),
    }
}

fn label_payload(drugs: &[DrugLabel]) -> serde_json::Value {
    let entries = drugs
        .iter()
        .filter_map(|d| {
            let record = d.record.as_ref()?;
            let sections = transform::label::sections(record);
            let clip = |s: Option<String>| {
                s.map(|v| truncate_chars(&v, SECTION_BUDGET_CHARS).to_string())
            };
            Some(serde_json::json!({
                "requested": d.requested,
                "brand_name": transform::label::brand_name(record),
                "generic_name": transform::label::generic_name(record),
                "drug_interactions": clip(sections.interactions),
                "warnings": clip(sections.boxed_warning.or(sections.warnings)),
                "contraindications": clip(sections.contraindications),
            }))
        })
        .collect::<Vec<_>>();
    serde_json::Value::Array(entries)
}

async fn ai_analysis(
    ai: &AiGateway,
    drugs: &[DrugLabel],
    language: Language,
) -> Option<InteractionResult> {
    let names = drugs.iter().map(DrugLabel::display).collect::<Vec<_>>().join(", ");
    let system = match prompts::render(
        prompts::INTERACTIONS,
        context! { drugs => names, language => language.prompt_name() },
    ) {
        Ok(prompt) => prompt,
        Err(err) => {
            warn!(mode = "interactions", error = %err, "Prompt rendering failed");
            return None;
        }
    };

    let request = CompletionRequest {
        messages: vec![
            ChatMessage::system(system),
            ChatMessage::user(label_payload(drugs).to_string()),
        ],
        temperature: 0.1,
        max_tokens: Some(3000),
        json_output: true,
    };

    let mut analysis = ai
        .try_in_order("interactions", &request, |content| {
            let value = parse_json_object(content)?;
            sanitize_into::<InteractionResult>(&value, &INTERACTION_RESULT)
                .ok_or_else(|| PharmaError::Internal("interaction result did not match shape".into()))
        })
        .await?;

    analysis.overall_risk = max_severity(&analysis.interactions)
        .filter(|s| s.rank() > 0)
        .unwrap_or(if analysis.interactions.is_empty() {
            Severity::Minor
        } else {
            analysis.overall_risk
        });
    if analysis.summary.en.is_empty() {
        analysis.summary = LocalizedText::text(
            "Interaction analysis complete. Review each item below.",
            "اكتمل تحليل التفاعلات. راجع كل بند أدناه.",
            "شیکاری کارلێک تەواو بوو. هەر بڕگەیەکی خوارەوە بپشکنە.",
        );
    }
    analysis.disclaimer = disclaimer();
    Some(analysis)
}

/// Cross-checks two or more drugs: label data first, then one AI analysis,
/// then the static rule table when AI is unavailable.
pub async fn check(
    labels: &OpenFdaClient,
    ai: &AiGateway,
    drugs: &[String],
    language: Language,
) -> InteractionResult {
    let names = dedupe_names(drugs);
    if names.len() < MIN_DRUGS {
        return too_few_drugs();
    }

    let fetched = join_all(names.into_iter().map(|name| fetch_drug(labels, name))).await;
    let missing = fetched
        .iter()
        .filter(|d| d.record.is_none())
        .map(|d| d.requested.clone())
        .collect::<Vec<_>>();
    if fetched.len() - missing.len() < MIN_DRUGS {
        info!(missing = missing.len(), "Too few labels for interaction check");
        return insufficient_data(&missing);
    }

    if ai.guard_tripped() {
        warn!(mode = "interactions", "AI guard tripped, using rule table");
        return fallback_result(&fetched);
    }

    match ai_analysis(ai, &fetched, language).await {
        Some(analysis) => analysis,
        None => fallback_result(&fetched),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::testing::{ScriptedProvider, gateway};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn drug(name: &str) -> DrugLabel {
        DrugLabel {
            requested: name.to_string(),
            record: Some(LabelRecord::default()),
        }
    }

    async fn label_server(generic: &str) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/drug/label.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [{"id": "x", "openfda": {"generic_name": [generic]}, "drug_interactions": ["May interact."]}]
            })))
            .mount(&server)
            .await;
        server
    }

    #[test]
    fn severity_normalizes_vocabulary() {
        assert_eq!(Severity::normalize("safe"), Severity::Minor);
        assert_eq!(Severity::normalize("NONE"), Severity::Minor);
        assert_eq!(Severity::normalize("High"), Severity::Critical);
        assert_eq!(Severity::normalize("medium"), Severity::Moderate);
        assert_eq!(Severity::normalize("whatever"), Severity::Unknown);
        let parsed: Severity = serde_json::from_str("\"severe\"").unwrap();
        assert_eq!(parsed, Severity::Critical);
        assert_eq!(serde_json::to_string(&Severity::Minor).unwrap(), "\"minor\"");
    }

    #[test]
    fn aspirin_and_warfarin_hit_critical_rule() {
        let hits = rule_interactions(&[drug("aspirin"), drug("warfarin")]);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].severity, Severity::Critical);
        assert!(hits[0].title.en.contains("bleeding"));
    }

    #[test]
    fn rule_table_covers_each_class_pair() {
        let cases = [
            ("diazepam", "oxycodone", Severity::Critical),
            ("simvastatin", "clarithromycin", Severity::Critical),
            ("sertraline", "naproxen", Severity::Moderate),
            ("lisinopril", "ibuprofen", Severity::Moderate),
            ("ibuprofen", "naproxen", Severity::Moderate),
        ];
        for (a, b, expected) in cases {
            let hits = rule_interactions(&[drug(a), drug(b)]);
            assert_eq!(hits.len(), 1, "{a} + {b}");
            assert_eq!(hits[0].severity, expected, "{a} + {b}");
        }
        assert!(rule_interactions(&[drug("amoxicillin"), drug("omeprazole")]).is_empty());
    }

    #[test]
    fn names_are_deduped_case_insensitively() {
        let names = dedupe_names(&["Aspirin".into(), " aspirin ".into(), "".into(), "Warfarin".into()]);
        assert_eq!(names, vec!["Aspirin", "Warfarin"]);
    }

    #[tokio::test]
    async fn single_drug_short_circuits_without_calls() {
        let provider = ScriptedProvider::ok("a", "{}");
        let ai = gateway(vec![provider.clone()]);
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        let labels = OpenFdaClient::new_for_test(server.uri()).unwrap();

        let out = check(&labels, &ai, &["aspirin".into(), "ASPIRIN".into()], Language::En).await;
        assert!(out.interactions.is_empty());
        assert!(out.summary.en.contains("at least two"));
        assert!(!out.summary.ku.is_empty());
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn ai_failure_falls_back_to_rule_table() {
        let server = label_server("generic").await;
        let labels = OpenFdaClient::new_for_test(server.uri()).unwrap();
        let ai = gateway(vec![ScriptedProvider::failing("a"), ScriptedProvider::failing("b")]);

        let out = check(&labels, &ai, &["aspirin".into(), "warfarin".into()], Language::En).await;
        assert_eq!(out.interactions.len(), 1);
        assert_eq!(out.interactions[0].severity, Severity::Critical);
        assert_eq!(out.overall_risk, Severity::Critical);
        assert_eq!(out.disclaimer, disclaimer());
    }

    #[tokio::test]
    async fn ai_result_is_sanitized_and_rolled_up() {
        let server = label_server("generic").await;
        let labels = OpenFdaClient::new_for_test(server.uri()).unwrap();
        let reply = r#"{"interactions": [
            {"severity": "safe", "title": "Minor effect"},
            {"severity": "moderate", "title": {"en": "Watch BP", "ar": "راقب الضغط"}, "advice": ["Check BP"]}
        ], "overallRisk": "low"}"#;
        let ai = gateway(vec![ScriptedProvider::ok("a", reply)]);

        let out = check(&labels, &ai, &["lisinopril".into(), "ibuprofen".into()], Language::Ar).await;
        assert_eq!(out.interactions.len(), 2);
        assert_eq!(out.interactions[0].severity, Severity::Minor);
        assert_eq!(out.interactions[0].title.ku, "Minor effect");
        assert_eq!(out.interactions[1].title.ku, "بەردەست نییە");
        assert_eq!(out.interactions[1].recommendations.en, vec!["Check BP"]);
        assert_eq!(out.overall_risk, Severity::Moderate);
        assert!(!out.summary.en.is_empty());
    }

    #[tokio::test]
    async fn ai_reporting_nothing_is_minor() {
        let server = label_server("generic").await;
        let labels = OpenFdaClient::new_for_test(server.uri()).unwrap();
        let ai = gateway(vec![ScriptedProvider::ok("a", r#"{"interactions": [], "overallRisk": "none"}"#)]);

        let out = check(&labels, &ai, &["amoxicillin".into(), "omeprazole".into()], Language::En).await;
        assert!(out.interactions.is_empty());
        assert_eq!(out.overall_risk, Severity::Minor);
    }

    #[tokio::test]
    async fn missing_labels_yield_insufficient_data_without_ai() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/drug/label.json"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        let labels = OpenFdaClient::new_for_test(server.uri()).unwrap();
        let provider = ScriptedProvider::ok("a", "{}");
        let ai = gateway(vec![provider.clone()]);

        let out = check(&labels, &ai, &["xyzabc".into(), "qwerty".into()], Language::En).await;
        assert!(out.interactions.is_empty());
        assert_eq!(out.overall_risk, Severity::Unknown);
        assert!(out.summary.en.contains("xyzabc"));
        assert_eq!(provider.calls(), 0);
    }
}

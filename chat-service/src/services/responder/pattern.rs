//! Keyword rule responder.
//!
//! Rules are evaluated top-down and the first rule with any keyword contained
//! in the normalised input wins; rule order is the tie-break. A reply is then
//! drawn uniformly from that rule, or from the default list when nothing
//! matched.

use super::{GeneratorError, ResponseGenerator};
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::sync::Mutex;

/// One keyword rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    keywords: Vec<String>,
    replies: Vec<String>,
}

impl Rule {
    pub fn new(keywords: &[&str], replies: &[&str]) -> Self {
        Self {
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
            replies: replies.iter().map(|r| r.to_string()).collect(),
        }
    }

    fn matches(&self, normalized: &str) -> bool {
        self.keywords.iter().any(|k| normalized.contains(k.as_str()))
    }
}

pub struct PatternResponder {
    rules: Vec<Rule>,
    defaults: Vec<String>,
    rng: Mutex<StdRng>,
}

impl PatternResponder {
    pub fn new(rules: Vec<Rule>, defaults: Vec<String>) -> Self {
        Self::with_rng(rules, defaults, StdRng::from_entropy())
    }

    /// Same as [`PatternResponder::new`] with a caller-supplied random source.
    pub fn with_rng(rules: Vec<Rule>, defaults: Vec<String>, rng: StdRng) -> Self {
        // A rule with nothing to say can never be answered; drop it.
        let rules = rules.into_iter().filter(|r| !r.replies.is_empty()).collect();
        Self {
            rules,
            defaults,
            rng: Mutex::new(rng),
        }
    }

    /// The assistant persona table.
    pub fn builtin() -> Self {
        Self::new(builtin_rules(), builtin_defaults())
    }

    pub fn builtin_seeded(seed: u64) -> Self {
        Self::with_rng(builtin_rules(), builtin_defaults(), StdRng::seed_from_u64(seed))
    }

    /// Index of the first rule matching `text`, if any.
    pub fn matching_rule(&self, text: &str) -> Option<usize> {
        let normalized = text.trim().to_lowercase();
        self.rules.iter().position(|rule| rule.matches(&normalized))
    }

    /// Replies the rule at `index` can produce.
    pub fn replies_for(&self, index: usize) -> Option<&[String]> {
        self.rules.get(index).map(|r| r.replies.as_slice())
    }

    pub fn defaults(&self) -> &[String] {
        &self.defaults
    }

    /// Picks a reply for `text`.
    pub fn respond(&self, text: &str) -> Option<String> {
        let pool = match self.matching_rule(text) {
            Some(index) => &self.rules[index].replies,
            None => &self.defaults,
        };

        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        pool.choose(&mut *rng).cloned()
    }
}

#[async_trait]
impl ResponseGenerator for PatternResponder {
    async fn generate(&self, text: &str, _session_id: &str) -> Result<String, GeneratorError> {
        self.respond(text).ok_or_else(|| {
            GeneratorError::NotConfigured("Pattern responder has no default replies".to_string())
        })
    }

    fn name(&self) -> &'static str {
        "pattern"
    }
}

fn builtin_rules() -> Vec<Rule> {
    vec![
        // Greetings
        Rule::new(
            &["hola", "hello", "hi", "buenos días", "buenas tardes", "buenas noches", "saludos"],
            &[
                "¡Hola! Soy NEXUS AI, tu asistente inteligente. ¿En qué puedo ayudarte hoy?",
                "¡Saludos, usuario! Sistema NEXUS operativo. ¿Cuál es tu consulta?",
                "¡Buenos días! NEXUS AI a tu servicio. ¿Cómo puedo asistirte?",
                "Conexión establecida. Soy NEXUS, tu asistente de inteligencia artificial. ¿En qué te puedo ayudar?",
            ],
        ),
        // AI and technology
        Rule::new(
            &["inteligencia artificial", "ai", "tecnología", "futuro", "nexus", "robot", "máquina"],
            &[
                "La inteligencia artificial representa el futuro de la interacción humano-máquina. Como NEXUS AI, estoy diseñado para asistir y aprender continuamente.",
                "La tecnología AI como yo está evolucionando rápidamente. Mi función es procesar información y brindar respuestas útiles e inteligentes.",
                "NEXUS es un sistema avanzado de IA diseñado para comprender y responder de manera natural. ¿Hay algo específico sobre AI que te interese?",
                "El futuro de la tecnología está en sistemas como NEXUS: interfaces inteligentes que pueden adaptarse y aprender. ¿Qué aspecto te interesa más?",
            ],
        ),
        // Help requests
        Rule::new(
            &["ayuda", "help", "asistencia", "necesito", "puedes", "cómo", "qué", "explica"],
            &[
                "Estoy aquí para ayudarte. Como NEXUS AI, puedo asistirte con información, responder preguntas y mantener conversaciones inteligentes.",
                "Mi sistema está diseñado para proporcionar asistencia integral. ¿Qué información específica necesitas?",
                "Activando protocolos de asistencia NEXUS. Describe tu consulta y te proporcionaré la información más relevante.",
                "Sistema de ayuda NEXUS activado. Puedo ayudarte con una amplia gama de temas. ¿En qué área necesitas asistencia?",
            ],
        ),
        // Identity
        Rule::new(
            &["quien eres", "qué eres", "nombre", "te llamas", "identidad"],
            &[
                "Soy NEXUS AI, un asistente de inteligencia artificial avanzado. Mi propósito es ayudar y proporcionar información útil.",
                "Mi identificación es NEXUS - Neural Enhanced eXpert User System. Soy una IA diseñada para interacciones inteligentes.",
                "NEXUS AI es mi designación. Soy un sistema de inteligencia artificial con capacidades de procesamiento natural del lenguaje.",
                "Me identifico como NEXUS, tu asistente AI. Estoy programado para comprender y responder de manera natural e inteligente.",
            ],
        ),
        // Capabilities
        Rule::new(
            &["qué puedes hacer", "capacidades", "funciones", "servicios", "habilidades"],
            &[
                "Mis capacidades incluyen: procesamiento de lenguaje natural, análisis de información, respuestas inteligentes y asistencia conversacional.",
                "NEXUS puede ayudarte con información, responder preguntas complejas, mantener conversaciones naturales y proporcionar análisis inteligentes.",
                "Mi sistema está equipado con protocolos de conversación, análisis de datos, generación de respuestas contextuales y aprendizaje adaptativo.",
                "Como NEXUS AI, tengo capacidades avanzadas de comprensión, análisis y generación de respuestas personalizadas para cada consulta.",
            ],
        ),
        // Weather and time
        Rule::new(
            &["clima", "tiempo", "temperatura", "lluvia", "sol", "hora", "fecha"],
            &[
                "Lo siento, no tengo acceso a datos meteorológicos en tiempo real, pero puedo ayudarte con muchas otras consultas.",
                "Mi sistema actual no incluye sensores meteorológicos, pero estoy aquí para asistirte con información y conversación inteligente.",
                "Para información del clima, te recomiendo consultar servicios especializados. ¿Hay algo más en lo que pueda ayudarte?",
                "Los datos temporales y meteorológicos están fuera de mi alcance actual, pero tengo muchas otras capacidades disponibles.",
            ],
        ),
        // Thanks and praise
        Rule::new(
            &["gracias", "excelente", "bueno", "genial", "perfecto", "increíble", "amazing"],
            &[
                "¡Me alegra haber sido útil! El sistema NEXUS está diseñado para brindar la mejor asistencia posible.",
                "Gracias por tu feedback positivo. Mi programación se optimiza con cada interacción exitosa.",
                "Es un placer asistirte. NEXUS AI continúa evolucionando para proporcionar mejores respuestas.",
                "Aprecio tu reconocimiento. Mi objetivo es superar las expectativas en cada consulta.",
            ],
        ),
        // Farewells
        Rule::new(
            &["adiós", "bye", "hasta luego", "nos vemos", "chao", "farewell"],
            &[
                "¡Hasta la próxima! NEXUS AI permanecerá en standby para futuras consultas.",
                "Conexión finalizada exitosamente. ¡Que tengas un excelente día!",
                "Sistema NEXUS entrando en modo de espera. ¡Vuelve cuando necesites asistencia!",
                "¡Adiós por ahora! NEXUS AI estará aquí cuando me necesites de nuevo.",
            ],
        ),
    ]
}

fn builtin_defaults() -> Vec<String> {
    [
        "Interesante consulta. Como NEXUS AI, procesaré tu información y te ayudaré en lo que pueda.",
        "Entiendo tu mensaje. Mi sistema está analizando la mejor forma de asistirte.",
        "Gracias por tu consulta. NEXUS AI está procesando... ¿Puedes ser más específico?",
        "Tu mensaje ha sido recibido. ¿Podrías proporcionar más detalles para una respuesta más precisa?",
        "Sistema NEXUS activado. Analizando tu consulta... Por favor, describe más sobre lo que necesitas.",
        "Protocolo de respuesta NEXUS iniciado. ¿Hay algo específico en lo que pueda concentrarme?",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

//! The built-in course: chapter catalog, completion table and opening sections

use serde_json::json;
use std::collections::HashMap;

use super::completion::CompletionRequirements;
use super::{ChapterConfig, ChapterId, ChapterSection, ContentLibrary, CourseCatalog, SectionKind};
use crate::icons::IconName;
use crate::Tier;

const CHAPTERS: [(&str, &str, IconName, Tier); 12] = [
    ("Introdução: Diagnóstico Inicial", "Introdução", IconName::ClipboardList, Tier::Free),
    ("Capítulo 1: Aceitando a Realidade", "Aceitando a Realidade", IconName::CheckSquare, Tier::Free),
    ("Capítulo 2: A Arte de Errar Melhor", "Errar Melhor", IconName::Compass, Tier::Free),
    ("Capítulo 3: O Método MPC em Ação", "O Método MPC", IconName::RefreshCw, Tier::Essential),
    ("Capítulo 4: Destruindo o \"Tudo ou Nada\" (TAE)", "O Método TAE", IconName::Layers, Tier::Essential),
    ("Capítulo 5: Paradoxo do Controle (Flexibilidade)", "Paradoxo do Controle", IconName::GitBranch, Tier::Essential),
    ("Capítulo 6: Autoridade Autêntica (Erros)", "Autoridade Autêntica", IconName::BadgeCheck, Tier::Essential),
    ("Capítulo 7: Regra 80/20 na Prática", "A Regra 80/20", IconName::PieChart, Tier::Essential),
    ("Capítulo 8: Modelo Antifrágil", "O Modelo Antifrágil", IconName::Flame, Tier::Complete),
    ("Capítulo 9: Semana Intensiva MPC", "Semana Intensiva MPC", IconName::CalendarDays, Tier::Complete),
    ("Capítulo 10: Integrando para Sempre", "Integrando para Sempre", IconName::Infinity, Tier::Complete),
    ("Conclusão: Comece Agora!", "Conclusão", IconName::PlayCircle, Tier::Complete),
];

const REQUIREMENTS: [&[&str]; 12] = [
    &["c0_commitment"],
    &["c1_task_done", "c1_5min_rule_done", "c1_mvp_created", "c1_exercise_commit"],
    &["c2_controlled_error_done", "c2_ex_decision"],
    &["c3_action_blocks_commit", "c3_ex_commit"],
    &["c4_test_executed"],
    &["c5_let_go_done", "c5_ex_done"],
    &["c6_ethics_check1", "c6_ethics_check2", "c6_ethics_check3", "c6_share_done"],
    &["c7_action_taken", "c7_ex_commit_amplify", "c7_ex_commit_reduce"],
    &["c8_barbell_done"],
    &["c9_d5_practiced", "c9_d6_done"],
    &["c10_review_scheduled"],
    &["c11_action_done", "c11_declaration_done", "c11_sharing_done"],
];

// (quote, objective) opening each chapter
const OPENINGS: [(&str, &str); 12] = [
    (
        "O mundo não precisa de mais um livro sobre produtividade perfeita. Precisa de um manual para quem vive no caos.",
        "Antes de mergulhar nos métodos, vamos fazer um diagnóstico honesto do seu ponto de partida. Entender suas frustrações atuais e o que você busca é o primeiro passo para construir um sistema que *realmente* funcione para você. Responda às perguntas abaixo com sinceridade. Não há respostas certas ou erradas, apenas a *sua* realidade.",
    ),
    (
        "Pare de lutar contra a maré do caos. Em vez disso, vamos aprender a surfar nela.",
        "Neste capítulo, desmontamos a busca pela perfeição e pelo controle absoluto. O objetivo agora é começar a internalizar a aceitação da incerteza e, principalmente, *agir* de forma imperfeita, mas consistente. Vamos quebrar a paralisia do perfeccionismo com ações pequenas e imediatas.",
    ),
    (
        "O erro não é um acidente indesejado – ele é feedback. É informação valiosa. É a bússola que nos ajuda a navegar.",
        "Superar o medo paralisante do fracasso e começar a ver os erros não como vereditos finais, mas como oportunidades cruciais de aprendizado e ajuste. Vamos extrair lições do passado e planejar \"erros controlados\" para aprender mais rápido.",
    ),
    (
        "O Ciclo Orientar -> Agir -> Aprender/Adaptar não é algo que você faz uma vez. É seu sistema operacional contínuo para navegar na incerteza.",
        "Internalizar e começar a aplicar o núcleo prático do Método da Produtividade Caótica: o Ciclo contínuo e os 3 Passos diários (Bússola, Blocos de Ação, Check-in Adaptativo).",
    ),
    (
        "A ação imperfeita e consistente sempre superará a busca paralisante pela perfeição. Comece pequeno, aprenda rápido, melhore sempre.",
        "Superar a mentalidade perfeccionista do \"Tudo ou Nada\". Aprender e praticar o Método TAE (Teste, Ajuste, Escale) como uma ferramenta fundamental para fazer progresso incremental e real em projetos importantes.",
    ),
    (
        "Eficácia real não vem de controlar tudo. Vem de focar no que podemos controlar (nossas respostas, nossa energia) e desenvolver a adaptabilidade para lidar com o resto.",
        "Revisitar nossa relação com o controle. Aprender estratégias práticas para cultivar controle flexível: criar estruturas que oferecem direção, mas têm maleabilidade suficiente para absorver o inesperado e permitir a adaptação.",
    ),
    (
        "A maior prova de que você sabe o que está fazendo é mostrar como já errou no passado... e o que aprendeu com isso.",
        "Entender como sua jornada através do caos e os erros que você superou podem se tornar fontes de conexão, confiança e autoridade autêntica. Deixar de esconder as cicatrizes e começar a usá-las para ensinar.",
    ),
    (
        "A maioria das coisas não importa tanto quanto você pensa. Descubra o que realmente gera impacto e elimine (ou minimize drasticamente) o resto.",
        "Aprender a usar o Princípio de Pareto (Regra 80/20) como uma lente poderosa para identificar os poucos elementos (tarefas, esforços, clientes) que geram a maior parte dos resultados (os \"20% vitais\") e focar sua energia neles.",
    ),
    (
        "Não basta ser resistente ao caos. Você precisa aprender a crescer com ele.",
        "Explorar o conceito de Antifragilidade: a capacidade de sistemas (incluindo você, sua carreira e seus projetos) de se beneficiarem e se fortalecerem com a exposição a estressores, volatilidade, erros e caos.",
    ),
    (
        "Teoria sem prática é apenas entretenimento. A verdadeira transformação acontece na arena.",
        "Mergulhar de cabeça na prática! Durante os próximos 7 dias, você aplicará intencionalmente os conceitos e ferramentas chave do Método da Produtividade Caótica™. Preencha cada dia ao final dele.",
    ),
    (
        "A Produtividade Caótica não é um destino a ser alcançado, mas uma forma de viajar – um processo constante de orientação, ação e adaptação.",
        "Consolidar seus aprendizados e transformar a Produtividade Caótica em uma filosofia e prática sustentáveis, criando um sistema personalizado que funciona para VOCÊ.",
    ),
    (
        "A vida não vai ficar mais calma. Mas você pode ficar muito mais potente dentro dela... O caos, agora, está verdadeiramente do seu lado.",
        "Consolidar sua jornada e dar o impulso final e imediato para a ação. A teoria termina aqui; sua revolução de produtividade começa AGORA.",
    ),
];

const OBJECTIVE_TITLE: &str = "Objetivo Desta Etapa:";

pub fn default_catalog() -> CourseCatalog {
    let chapters = CHAPTERS
        .iter()
        .enumerate()
        .map(|(id, (title, short_title, icon, tier))| ChapterConfig {
            id: id as ChapterId,
            title: title.to_string(),
            short_title: short_title.to_string(),
            tier: *tier,
            icon: *icon,
        })
        .collect();
    CourseCatalog { chapters }
}

pub fn default_requirements() -> CompletionRequirements {
    CompletionRequirements::new(
        REQUIREMENTS
            .iter()
            .enumerate()
            .map(|(id, keys)| (id as ChapterId, keys.iter().map(|k| k.to_string()).collect()))
            .collect(),
    )
}

pub fn default_library() -> ContentLibrary {
    let sections: HashMap<ChapterId, Vec<ChapterSection>> = OPENINGS
        .iter()
        .enumerate()
        .map(|(id, (quote, objective))| {
            let objective_icon = match id {
                9 => IconName::Rocket,
                11 => IconName::Trophy,
                _ => IconName::Target,
            };
            let sections = vec![
                ChapterSection {
                    kind: SectionKind::Quote,
                    title: None,
                    content: json!(quote),
                    icon: None,
                },
                ChapterSection {
                    kind: SectionKind::Objective,
                    title: Some(OBJECTIVE_TITLE.to_string()),
                    content: json!(objective),
                    icon: Some(objective_icon),
                },
            ];
            (id as ChapterId, sections)
        })
        .collect();
    ContentLibrary::new(sections, HashMap::new())
}

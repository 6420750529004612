// src/common/text.rs

use std::collections::BTreeSet;

// Normalização dos tokens de busca do chamado. Os tokens são gravados na
// criação e regravados sempre que um campo tokenizado é editado, para a
// busca textual nunca trabalhar com dados defasados.

/// Remove acentuação do alfabeto português e rebaixa para minúsculas.
pub fn fold(texto: &str) -> String {
    texto
        .chars()
        .map(|c| match c.to_lowercase().next().unwrap_or(c) {
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            'ñ' => 'n',
            outro => outro,
        })
        .collect()
}

/// Mantém apenas os dígitos (telefone, CPF/CNPJ, número de venda).
pub fn digits_only(texto: &str) -> String {
    texto.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Monta o conjunto de tokens de busca a partir dos campos do cliente.
/// Palavras do nome entram normalizadas; campos numéricos entram só com
/// os dígitos. Tokens de um único caractere são descartados.
pub fn build_search_tokens(
    customer_name: &str,
    customer_phone: Option<&str>,
    customer_document: Option<&str>,
    sale_number: Option<&str>,
) -> Vec<String> {
    let mut tokens = BTreeSet::new();

    for palavra in fold(customer_name).split_whitespace() {
        let palavra: String = palavra.chars().filter(|c| c.is_alphanumeric()).collect();
        if palavra.chars().count() > 1 {
            tokens.insert(palavra);
        }
    }

    for campo in [customer_phone, customer_document, sale_number].into_iter().flatten() {
        let digitos = digits_only(campo);
        if digitos.len() > 1 {
            tokens.insert(digitos);
        }
    }

    tokens.into_iter().collect()
}

/// Formas normalizadas de um termo de busca, comparáveis com os tokens
/// gravados: a palavra sem acentos e, se houver, só os dígitos.
pub fn search_candidates(termo: &str) -> Vec<String> {
    let mut candidatos = BTreeSet::new();

    for palavra in fold(termo).split_whitespace() {
        let palavra: String = palavra.chars().filter(|c| c.is_alphanumeric()).collect();
        if !palavra.is_empty() {
            candidatos.insert(palavra);
        }
    }

    let digitos = digits_only(termo);
    if !digitos.is_empty() {
        candidatos.insert(digitos);
    }

    candidatos.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fold_remove_acentos_do_portugues() {
        assert_eq!(fold("João Conceição"), "joao conceicao");
        assert_eq!(fold("ADRIANA Müller"), "adriana muller");
    }

    #[test]
    fn tokens_incluem_nome_e_documentos_normalizados() {
        let tokens = build_search_tokens(
            "José da Silva",
            Some("(11) 98765-4321"),
            Some("123.456.789-00"),
            Some("VD-0042"),
        );
        assert!(tokens.contains(&"jose".to_string()));
        assert!(tokens.contains(&"silva".to_string()));
        assert!(tokens.contains(&"11987654321".to_string()));
        assert!(tokens.contains(&"12345678900".to_string()));
        assert!(tokens.contains(&"0042".to_string()));
        // partícula de uma letra não vira token
        assert!(!tokens.contains(&"a".to_string()));
    }

    #[test]
    fn campos_ausentes_nao_geram_tokens_vazios() {
        let tokens = build_search_tokens("Ana", None, None, None);
        assert_eq!(tokens, vec!["ana".to_string()]);
    }
}

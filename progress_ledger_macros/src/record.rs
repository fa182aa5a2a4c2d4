use proc_macro::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, Ident, LitStr};

pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as DeriveInput);
    let name = &input.ident;

    let collection = match extract_collection(&input) {
        Ok(collection) => collection,
        Err(err) => return err.to_compile_error().into(),
    };

    let key_fields = match extract_key_fields(&input) {
        Ok(fields) => fields,
        Err(err) => return err.to_compile_error().into(),
    };

    // A single key field is the key as-is; composite keys are escaped and
    // joined so distinct field tuples never share a key.
    let key_body = if key_fields.len() == 1 {
        let field = &key_fields[0];
        quote! { ::std::string::ToString::to_string(&self.#field) }
    } else {
        quote! {
            progress_ledger::record::composite_key([
                #( ::std::string::ToString::to_string(&self.#key_fields) ),*
            ])
        }
    };

    let expanded = quote! {
        impl progress_ledger::Record for #name {
            const COLLECTION: &'static str = #collection;

            fn key(&self) -> ::std::string::String {
                #key_body
            }
        }
    };

    TokenStream::from(expanded)
}

fn extract_collection(input: &DeriveInput) -> syn::Result<String> {
    for attr in &input.attrs {
        if !attr.path().is_ident("record") {
            continue;
        }

        let mut collection = None;
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("collection") {
                let value: LitStr = meta.value()?.parse()?;
                collection = Some(value.value());
                Ok(())
            } else {
                Err(meta.error("expected `collection = \"...\"`"))
            }
        })?;

        if let Some(c) = collection {
            return Ok(c);
        }
    }

    // Default: snake_case struct name + "s"
    Ok(format!("{}s", to_snake_case(&input.ident.to_string())))
}

fn extract_key_fields(input: &DeriveInput) -> syn::Result<Vec<Ident>> {
    let named = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input.ident,
                    "Record derive requires a struct with named fields",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input.ident,
                "Record derive only supports structs",
            ))
        }
    };

    let mut keys = Vec::new();
    for field in named {
        let mut is_key = false;
        for attr in field.attrs.iter().filter(|a| a.path().is_ident("record")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("key") {
                    is_key = true;
                    Ok(())
                } else {
                    Err(meta.error("expected `key`"))
                }
            })?;
        }
        if is_key {
            if let Some(ident) = &field.ident {
                keys.push(ident.clone());
            }
        }
    }

    if keys.is_empty() {
        // Fall back to a field literally named `id`.
        if let Some(id) = named
            .iter()
            .filter_map(|f| f.ident.as_ref())
            .find(|ident| *ident == "id")
        {
            keys.push(id.clone());
        }
    }

    if keys.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "Record derive: mark at least one field with #[record(key)] or add an `id` field",
        ));
    }

    Ok(keys)
}

fn to_snake_case(s: &str) -> String {
    let mut result = String::new();
    for (i, ch) in s.chars().enumerate() {
        if ch.is_uppercase() {
            if i > 0 {
                result.push('_');
            }
            result.extend(ch.to_lowercase());
        } else {
            result.push(ch);
        }
    }
    result
}

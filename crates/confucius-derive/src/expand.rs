use crate::attr::parse_field_attrs;
use proc_macro2::{Literal, TokenStream};
use quote::quote;
use syn::ext::IdentExt;
use syn::{Data, DeriveInput, Error, Fields, Result};

pub(crate) fn derive_config(input: &DeriveInput) -> Result<TokenStream> {
    let fields = match &input.data {
        Data::Struct(s) => match &s.fields {
            Fields::Named(named) => &named.named,
            _ => return Err(not_named(input)),
        },
        _ => return Err(not_named(input)),
    };

    let mut metas = Vec::with_capacity(fields.len());
    let mut idents = Vec::with_capacity(fields.len());
    for field in fields {
        let Some(ident) = &field.ident else {
            return Err(not_named(input));
        };
        let attrs = parse_field_attrs(field)?;

        let declared = ident.unraw().to_string();
        let tags = attrs.names.iter().map(|(tag, _)| tag);
        let names = attrs.names.iter().map(|(_, name)| name);
        let required = attrs.required;
        let flatten = attrs.flatten;
        let default = match &attrs.default {
            Some(literal) => quote!(::core::option::Option::Some(#literal)),
            None => quote!(::core::option::Option::None),
        };

        metas.push(quote! {
            ::confucius::bind::FieldMeta {
                ident: #declared,
                names: &[#((#tags, #names)),*],
                required: #required,
                default: #default,
                flatten: #flatten,
            }
        });
        idents.push(ident);
    }

    let indices = (0..idents.len()).map(Literal::usize_unsuffixed);
    let bind_calls = idents.iter().zip(indices.clone()).map(|(ident, i)| {
        quote! {
            ::confucius::bind::record::bind_field(&mut self.#ident, &Self::FIELDS[#i], path, ctx, out);
        }
    });
    let decode_calls = idents.iter().zip(indices).map(|(ident, i)| {
        quote! {
            ::confucius::bind::record::decode_field(&mut self.#ident, &Self::FIELDS[#i], node, path, ctx)?;
        }
    });

    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::confucius::bind::Config for #name #ty_generics #where_clause {
            const FIELDS: &'static [::confucius::bind::FieldMeta] = &[#(#metas),*];

            #[allow(unused_variables)]
            fn bind_fields<'__a>(
                &'__a mut self,
                path: &::confucius::bind::FieldPath,
                ctx: &::confucius::bind::BindContext,
                out: &mut ::std::vec::Vec<::confucius::bind::Field<'__a>>,
            ) {
                #(#bind_calls)*
            }

            #[allow(unused_variables)]
            fn decode_fields(
                &mut self,
                node: &::confucius::bind::Value,
                path: &::confucius::bind::FieldPath,
                ctx: &::confucius::bind::BindContext,
            ) -> ::core::result::Result<(), ::confucius::error::DecodeError> {
                #(#decode_calls)*
                ::core::result::Result::Ok(())
            }
        }

        impl #impl_generics ::confucius::bind::Bind for #name #ty_generics #where_clause {
            fn flatten<'__a>(
                &'__a mut self,
                _meta: &'static ::confucius::bind::FieldMeta,
                path: ::confucius::bind::FieldPath,
                ctx: &::confucius::bind::BindContext,
                out: &mut ::std::vec::Vec<::confucius::bind::Field<'__a>>,
            ) {
                ::confucius::bind::record::flatten_record(self, path, ctx, out);
            }

            fn decode(
                &mut self,
                node: &::confucius::bind::Value,
                path: &::confucius::bind::FieldPath,
                ctx: &::confucius::bind::BindContext,
            ) -> ::core::result::Result<(), ::confucius::error::DecodeError> {
                ::confucius::bind::record::decode_record(self, node, path, ctx)
            }
        }

        impl #impl_generics ::confucius::bind::Element for #name #ty_generics #where_clause {
            fn flatten_vec<'__a>(
                items: &'__a mut ::std::vec::Vec<Self>,
                _meta: &'static ::confucius::bind::FieldMeta,
                path: ::confucius::bind::FieldPath,
                ctx: &::confucius::bind::BindContext,
                out: &mut ::std::vec::Vec<::confucius::bind::Field<'__a>>,
            ) {
                ::confucius::bind::record::flatten_records(items, path, ctx, out);
            }

            fn decode_vec(
                items: &mut ::std::vec::Vec<Self>,
                node: &::confucius::bind::Value,
                path: &::confucius::bind::FieldPath,
                ctx: &::confucius::bind::BindContext,
            ) -> ::core::result::Result<(), ::confucius::error::DecodeError> {
                ::confucius::bind::record::decode_records(items, node, path, ctx)
            }

            fn flatten_option<'__a>(
                slot: &'__a mut ::core::option::Option<Self>,
                _meta: &'static ::confucius::bind::FieldMeta,
                path: ::confucius::bind::FieldPath,
                ctx: &::confucius::bind::BindContext,
                out: &mut ::std::vec::Vec<::confucius::bind::Field<'__a>>,
            ) {
                ::confucius::bind::record::flatten_optional_record(slot, path, ctx, out);
            }

            fn decode_option(
                slot: &mut ::core::option::Option<Self>,
                node: &::confucius::bind::Value,
                path: &::confucius::bind::FieldPath,
                ctx: &::confucius::bind::BindContext,
            ) -> ::core::result::Result<(), ::confucius::error::DecodeError> {
                ::confucius::bind::record::decode_optional_record(slot, node, path, ctx)
            }
        }
    })
}

fn not_named(input: &DeriveInput) -> Error {
    Error::new_spanned(
        &input.ident,
        "Config can only be derived for structs with named fields",
    )
}

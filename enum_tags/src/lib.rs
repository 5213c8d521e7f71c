use std::{collections::HashMap, fmt};

use proc_macro::TokenStream;
use quote::quote;

enum Visibility {
    Public(proc_macro2::Span),
    Private,
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Public(..) => "public",
            Self::Private => "private",
        })
    }
}

impl syn::parse::Parse for Visibility {
    fn parse(input: syn::parse::ParseStream) -> syn::Result<Self> {
        let identifier = input.parse::<syn::Ident>()?;
        match identifier.to_string().as_str() {
            "public" => Ok(Self::Public(identifier.span())),
            "private" => Ok(Self::Private),
            _ => Err(syn::Error::new_spanned(
                identifier,
                "Unexpected visibility: expected `public` or `private`",
            )),
        }
    }
}

struct EnumTagsArgs {
    visibility: Visibility,
    repr_type: syn::Type,
}

impl syn::parse::Parse for EnumTagsArgs {
    fn parse(input: syn::parse::ParseStream) -> syn::Result<Self> {
        mod kw {
            use syn::custom_keyword;

            custom_keyword!(repr);
        }

        let visibility = input.parse()?;

        input.parse::<syn::Token![,]>().map_err(|mut error| {
            error.combine(syn::Error::new(
                input.span(),
                format!("Missing comma after `{}` visibility", visibility),
            ));
            error
        })?;

        input.parse::<kw::repr>().map_err(|mut error| {
            error.combine(syn::Error::new(
                input.span(),
                format!("Missing `repr` after `{},`", visibility),
            ));
            error
        })?;

        let content;
        syn::parenthesized!(content in input);
        let repr_type = content.parse()?;

        Ok(Self {
            visibility,
            repr_type,
        })
    }
}

/// Reads a literal discriminant such as `0b10000010` or `0x82`. `syn`
/// normalizes every integer literal base to decimal digits for us.
fn parse_discriminant(expr: &syn::Expr) -> syn::Result<usize> {
    match expr {
        syn::Expr::Lit(syn::ExprLit {
            lit: syn::Lit::Int(int_literal),
            ..
        }) => int_literal.base10_parse::<usize>(),
        other => Err(syn::Error::new_spanned(
            other,
            "Only literal discriminants are allowed",
        )),
    }
}

fn impl_enum_tags(
    enum_visibility: syn::Visibility,
    enum_name: &syn::Ident,
    repr_type: syn::Type,
    variants: &mut syn::punctuated::Punctuated<syn::Variant, syn::Token![,]>,
) -> proc_macro2::TokenStream {
    let mut tag_idents = vec![];
    let mut tag_values = vec![];
    let mut tag_cases = vec![];
    let mut mnemonic_cases = vec![];
    let mut seen: HashMap<usize, syn::Ident> = HashMap::new();
    let mut discriminant = 0;

    for variant in variants.iter_mut() {
        let variant_name = variant.ident.clone();
        let mnemonic = variant_name.to_string().to_ascii_uppercase();
        let tag_ident = quote::format_ident!("{}_TAG", mnemonic);

        // the discriminant only feeds the generated tag, so it is removed
        // from the enum itself, which may carry fields
        if let Some((_, custom_discriminant)) = variant.discriminant.take() {
            match parse_discriminant(&custom_discriminant) {
                Ok(value) => discriminant = value,
                Err(error) => return error.into_compile_error(),
            }
        }

        if let Some(previous) = seen.insert(discriminant, variant_name.clone())
        {
            return syn::Error::new_spanned(
                &variant_name,
                format!(
                    "Tag {:#04x} of `{}` is already used by `{}`",
                    discriminant, variant_name, previous
                ),
            )
            .into_compile_error();
        }

        tag_idents.push(quote! {
            #[doc = concat!("`#[enum_tags]`-generated tag for the variant `Self::", stringify!(#variant_name), "`.")]
            #enum_visibility const #tag_ident: #repr_type = #discriminant as _;
        });
        tag_values.push(quote! { Self::#tag_ident });

        let pattern = match variant.fields {
            syn::Fields::Named(_) => quote! { Self::#variant_name { .. } },
            syn::Fields::Unnamed(_) => quote! { Self::#variant_name(..) },
            syn::Fields::Unit => quote! { Self::#variant_name },
        };
        tag_cases.push(quote! { #pattern => Self::#tag_ident });
        mnemonic_cases.push(quote! { #pattern => #mnemonic });

        discriminant += 1;
    }

    let tag_count = tag_values.len();

    quote! {
        impl #enum_name {
            #(#tag_idents)*

            #[doc = "`#[enum_tags]`-generated list of every tag, in declaration order."]
            #enum_visibility const TAGS: [#repr_type; #tag_count] = [#(#tag_values),*];

            #[doc = "`#[enum_tags]`-generated getter for this variant's tag."]
            #enum_visibility const fn tag(&self) -> #repr_type {
                match self {
                    #(#tag_cases),*
                }
            }

            #[doc = "`#[enum_tags]`-generated upper-case name of this variant."]
            #enum_visibility const fn mnemonic(&self) -> &'static str {
                match self {
                    #(#mnemonic_cases),*
                }
            }
        }
    }
}

/// Constructs an `impl` for the given `enum` with a constant for the tag of
/// each variant, a `TAGS` array, and `tag()`/`mnemonic()` getters.
///
/// Variants may carry literal discriminants (in any base) to pin their tag,
/// even when they have fields; otherwise tags count up from the previous one.
/// The discriminants are stripped from the emitted `enum`. Two variants
/// sharing a tag is a compile error.
///
/// Usage examples:
///
/// * `#[enum_tags(public, repr(u8))]`
/// * `#[enum_tags(private, repr(u32))]`
///
/// Note that the `repr` type can be any numerical type to which a `usize` can
/// be casted to implicitly with the `as` keyword --- it is not the same as the
/// type for which you may `#[repr(...)]` the `enum`.
#[proc_macro_attribute]
pub fn enum_tags(args: TokenStream, input: TokenStream) -> TokenStream {
    let args = syn::parse_macro_input!(args as EnumTagsArgs);

    let mut input_item = syn::parse_macro_input!(input as syn::DeriveInput);

    let data_enum = match &mut input_item.data {
        syn::Data::Enum(data_enum) => data_enum,
        syn::Data::Struct(syn::DataStruct {
            struct_token: syn::token::Struct { span },
            ..
        })
        | syn::Data::Union(syn::DataUnion {
            union_token: syn::token::Union { span },
            ..
        }) => {
            return syn::Error::new(*span, "Item must be an `enum`")
                .into_compile_error()
                .into();
        }
    };

    let visibility = match args.visibility {
        Visibility::Public(span) => {
            syn::Visibility::Public(syn::token::Pub { span })
        }
        Visibility::Private => syn::Visibility::Inherited,
    };

    let tags_impl = impl_enum_tags(
        visibility,
        &input_item.ident,
        args.repr_type,
        &mut data_enum.variants,
    );

    quote! {
        #input_item

        #tags_impl
    }
    .into()
}

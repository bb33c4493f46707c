use proc_macro::TokenStream;
use proc_macro2::Ident;
use quote::{quote, ToTokens};
use syn::{parse::Parser, punctuated::Punctuated, spanned::Spanned, Expr, ExprAssign, Token};

fn token_stream_with_error(mut tokens: TokenStream, error: syn::Error) -> TokenStream {
    tokens.extend(TokenStream::from(error.into_compile_error()));
    tokens
}

const ALLOWED_ATTRIBUTES: &[&str] = &["changelog", "allow_anonymous_access", "admin_password"];

fn assigned_name(assign: &ExprAssign) -> Option<String> {
    match assign.left.as_ref() {
        Expr::Path(p) => p.path.get_ident().map(|i| i.to_string()),
        _ => None,
    }
}

fn parse_attributes(
    args: &TokenStream,
    input: &syn::ItemFn,
) -> Result<proc_macro2::TokenStream, syn::Error> {
    let args: Punctuated<ExprAssign, syn::token::Comma> =
        Punctuated::<ExprAssign, Token![,]>::parse_terminated.parse(args.clone())?;

    let args_are_allowed = args.iter().all(|assign| {
        assigned_name(assign)
            .map(|name| ALLOWED_ATTRIBUTES.contains(&name.as_str()))
            .unwrap_or(false)
    });

    if !args_are_allowed {
        let msg = "Invalid test config attribute. The following are allowed";
        return Err(syn::Error::new_spanned(
            input.sig.fn_token,
            format!("{}: {}", msg, ALLOWED_ATTRIBUTES.join(", ")),
        ));
    }

    let mut field_modifications = quote! {};
    for assign in args.iter() {
        let field_name = assign.left.to_token_stream();
        let field_value = assign.right.to_token_stream();
        field_modifications.extend(quote! {
            #field_name: #field_value,
        });
    }

    Ok(quote!(crate::testkit::TestConfiguration {
        #field_modifications
        ..crate::testkit::TestConfiguration::default()
    }))
}

pub(crate) fn ds_test(args: &TokenStream, item: TokenStream) -> TokenStream {
    let input: syn::ItemFn = match syn::parse(item.clone()) {
        Ok(it) => it,
        Err(e) => return token_stream_with_error(item, e),
    };

    if let Some(attr) = input.attrs.iter().find(|attr| attr.path().is_ident("test")) {
        let msg = "second test attribute is supplied";
        return token_stream_with_error(item, syn::Error::new_spanned(attr, msg));
    };

    if input.sig.asyncness.is_some() {
        let msg = "the directory pipeline is synchronous, remove the `async` keyword";
        return token_stream_with_error(item, syn::Error::new_spanned(input.sig.fn_token, msg));
    }

    let test_config = match parse_attributes(args, &input) {
        Ok(tc) => tc,
        Err(e) => return token_stream_with_error(args.clone(), e),
    };

    let test_fn = &input.sig.ident;
    let test_driver = Ident::new(&format!("ds_{}", test_fn), input.sig.span());

    let result = quote! {
        #input

        #[::core::prelude::v1::test]
        fn #test_driver() {
            let test_config = #test_config;
            let test_server = crate::testkit::setup_test(test_config);

            #test_fn(&test_server);

            let verifications = test_server.verify();
            ::sketching::tracing::trace!("Verification result: {:?}", verifications);
            assert!(verifications.is_empty());
            assert!(test_server.shutdown().is_ok());
        }
    };

    result.into()
}

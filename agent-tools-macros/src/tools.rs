use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::meta::ParseNestedMeta;
use syn::spanned::Spanned;
use syn::{
    Attribute, FnArg, GenericArgument, ImplItem, ImplItemFn, ItemImpl, LitBool, LitStr, Meta, Pat,
    Path, PathArguments, ReturnType, Type, TypeParamBound, parse_quote,
};

/// Options accepted by `#[tools(...)]`.
pub struct Options {
    krate: Path,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            krate: parse_quote!(::agent_tools),
        }
    }
}

impl Options {
    pub fn parse(&mut self, meta: ParseNestedMeta<'_>) -> syn::Result<()> {
        if meta.path.is_ident("crate") {
            let path: LitStr = meta.value()?.parse()?;
            self.krate = path.parse()?;
            Ok(())
        } else {
            Err(meta.error("unsupported `tools` option"))
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Shape {
    Unit,
    Value,
    Future,
    UnitFuture,
    Stream,
}

#[derive(Default)]
struct ToolAttr {
    name: Option<LitStr>,
    description: Vec<LitStr>,
    execution: Option<&'static str>,
}

impl ToolAttr {
    fn parse(attr: &Attribute) -> syn::Result<Self> {
        let mut parsed = Self::default();
        if matches!(attr.meta, Meta::Path(_)) {
            return Ok(parsed);
        }

        attr.parse_nested_meta(|meta| {
            let execution = if meta.path.is_ident("name") {
                parsed.name = Some(meta.value()?.parse()?);
                return Ok(());
            } else if meta.path.is_ident("description") {
                parsed.description.push(meta.value()?.parse()?);
                return Ok(());
            } else if meta.path.is_ident("blocking") {
                "Blocking"
            } else if meta.path.is_ident("non_blocking") {
                "NonBlocking"
            } else if meta.path.is_ident("virtual_thread") {
                "RunOnVirtualThread"
            } else {
                return Err(meta.error("unsupported `tool` option"));
            };

            if parsed.execution.replace(execution).is_some() {
                return Err(meta.error("only one execution model may be declared"));
            }
            Ok(())
        })?;
        Ok(parsed)
    }
}

struct Param {
    name: String,
    ty: Type,
    description: Option<LitStr>,
    required: Option<LitBool>,
    session_id: bool,
}

pub fn expand(options: &Options, mut item: ItemImpl) -> syn::Result<TokenStream> {
    if let Some((_, path, _)) = &item.trait_ {
        return Err(syn::Error::new(
            path.span(),
            "#[tools] must be placed on an inherent impl block",
        ));
    }
    if !item.generics.params.is_empty() {
        return Err(syn::Error::new(
            item.generics.span(),
            "#[tools] does not support generic impl blocks",
        ));
    }

    let krate = &options.krate;
    let self_ty = item.self_ty.clone();
    let mut methods = Vec::new();

    for impl_item in &mut item.items {
        let ImplItem::Fn(function) = impl_item else {
            continue;
        };
        let Some(index) = function.attrs.iter().position(|attr| attr.path().is_ident("tool")) else {
            continue;
        };
        let attr = function.attrs.remove(index);
        let tool = ToolAttr::parse(&attr)?;
        methods.push(method(krate, &self_ty, function, tool)?);
    }

    Ok(quote! {
        #item

        impl #krate::ToolHost for #self_ty {
            fn tool_methods() -> ::std::vec::Vec<#krate::ToolMethod> {
                ::std::vec![#(#methods),*]
            }
        }

        #krate::__private::inventory::submit! {
            #krate::ToolDeclaration::new(
                <#self_ty as #krate::ToolHost>::type_info,
                <#self_ty as #krate::ToolHost>::tool_methods,
            )
        }
    })
}

fn method(
    krate: &Path,
    self_ty: &Type,
    function: &mut ImplItemFn,
    tool: ToolAttr,
) -> syn::Result<TokenStream> {
    let ident = function.sig.ident.clone();
    let method_name = ident.to_string();
    let method_name = method_name.trim_start_matches("r#");

    let has_receiver = match function.sig.receiver() {
        None => false,
        Some(receiver) if receiver.reference.is_some() && receiver.mutability.is_none() => true,
        Some(receiver) => {
            return Err(syn::Error::new(
                receiver.span(),
                "tool methods must take `&self` or no receiver",
            ));
        }
    };

    let params = take_params(function)?;
    let (shape, fallible) = classify(&function.sig)?;

    let bindings: Vec<_> = (0..params.len()).map(|index| format_ident!("__arg{index}")).collect();
    let decodes = params.iter().zip(&bindings).map(|(param, binding)| {
        let ty = &param.ty;
        let name = &param.name;
        quote! {
            let #binding: #ty = #krate::__private::argument(&mut __args, #name)?;
        }
    });

    let call = if has_receiver {
        quote!(__this.#ident(#(#bindings),*))
    } else {
        quote!(<#self_ty>::#ident(#(#bindings),*))
    };
    let receiver = if has_receiver {
        quote!(let __this = #krate::__private::receiver::<#self_ty>(__receiver)?;)
    } else {
        quote!(let _ = __receiver;)
    };
    let arguments = if params.is_empty() {
        quote!(let _ = __args;)
    } else {
        quote!(let mut __args = __args.into_iter();)
    };
    let convert = if fallible {
        quote!(#krate::__private::from_result)
    } else {
        quote!(#krate::__private::to_value)
    };

    let body = match shape {
        Shape::Stream => {
            let qualified = format!("{}.{method_name}", quote!(#self_ty));
            quote! {
                let _ = (__receiver, __args);
                #krate::__private::unsupported(#qualified)
            }
        }
        Shape::Future | Shape::UnitFuture => quote! {
            #receiver
            #arguments
            #(#decodes)*
            ::std::result::Result::Ok(#krate::ToolOutput::pending(async move {
                #convert(#call.await)
            }))
        },
        Shape::Unit | Shape::Value => quote! {
            #receiver
            #arguments
            #(#decodes)*
            #krate::__private::ready(#convert(#call))
        },
    };

    let return_type = match shape {
        Shape::Unit => quote!(#krate::ReturnType::Unit),
        Shape::Value => quote!(#krate::ReturnType::Value),
        Shape::Future => quote!(#krate::ReturnType::Future),
        Shape::UnitFuture => quote!(#krate::ReturnType::UnitFuture),
        Shape::Stream => quote!(#krate::ReturnType::Stream),
    };

    let tool_name = tool.name.map(|name| quote!(.with_tool_name(#name)));
    let description = tool.description.iter().map(|line| quote!(.with_description_line(#line)));
    let execution = tool.execution.map(|variant| {
        let variant = format_ident!("{variant}");
        quote!(.with_annotation(#krate::ExecutionAnnotation::#variant))
    });
    let parameters = params.iter().map(|param| parameter(krate, param));

    Ok(quote! {
        #krate::ToolMethod::new(
            <#self_ty as #krate::ToolHost>::type_info(),
            #method_name,
            #krate::dispatch::tool_target(|__receiver, __args| { #body }),
        )
        #tool_name
        #(#description)*
        #(#parameters)*
        .with_return_type(#return_type)
        #execution
    })
}

fn parameter(krate: &Path, param: &Param) -> TokenStream {
    let name = &param.name;
    let ty = &param.ty;

    let semantic = if param.session_id {
        quote!(#krate::SemanticType::Text)
    } else {
        quote!(<#ty as #krate::ToolParam>::semantic_type())
    };

    let mut annotation = quote!(#krate::ParameterAnnotation::new());
    if let Some(description) = &param.description {
        annotation = quote!(#annotation.with_description(#description));
    }
    if let Some(required) = &param.required {
        annotation = quote!(#annotation.with_required(#required));
    }
    if param.session_id {
        annotation = quote!(#annotation.session_id());
        let optional = last_segment_ident(ty).is_some_and(|ident| ident == "Option");
        if param.required.is_none() && optional {
            annotation = quote!(#annotation.with_required(false));
        }
    }

    quote! {
        .with_parameter(#krate::MethodParameter::new(#name, #semantic).with_annotation(#annotation))
    }
}

fn take_params(function: &mut ImplItemFn) -> syn::Result<Vec<Param>> {
    let mut params = Vec::new();

    for input in &mut function.sig.inputs {
        let FnArg::Typed(typed) = input else {
            continue;
        };
        let Pat::Ident(pat) = &*typed.pat else {
            return Err(syn::Error::new(
                typed.pat.span(),
                "tool parameters must be plain identifiers",
            ));
        };
        if let Type::Reference(reference) = &*typed.ty {
            return Err(syn::Error::new(
                reference.span(),
                "tool parameters must be owned types",
            ));
        }

        let name = pat.ident.to_string().trim_start_matches("r#").to_owned();
        let mut param = Param {
            name,
            ty: (*typed.ty).clone(),
            description: None,
            required: None,
            session_id: false,
        };

        let mut kept = Vec::with_capacity(typed.attrs.len());
        for attr in typed.attrs.drain(..) {
            if attr.path().is_ident("session_id") {
                param.session_id = true;
            } else if attr.path().is_ident("p") {
                attr.parse_nested_meta(|meta| {
                    if meta.path.is_ident("description") {
                        param.description = Some(meta.value()?.parse()?);
                        Ok(())
                    } else if meta.path.is_ident("required") {
                        param.required = Some(meta.value()?.parse()?);
                        Ok(())
                    } else {
                        Err(meta.error("unsupported parameter option"))
                    }
                })?;
            } else {
                kept.push(attr);
            }
        }
        typed.attrs = kept;
        params.push(param);
    }

    Ok(params)
}

fn classify(sig: &syn::Signature) -> syn::Result<(Shape, bool)> {
    let output = match &sig.output {
        ReturnType::Default => None,
        ReturnType::Type(_, ty) => Some(&**ty),
    };

    if sig.asyncness.is_some() {
        return Ok((future_shape(output), output.is_some_and(is_result)));
    }

    let Some(ty) = output else {
        return Ok((Shape::Unit, false));
    };

    if is_stream(ty) {
        return Ok((Shape::Stream, false));
    }
    if let Some(future) = future_output(ty) {
        let shape = match future {
            Some(output) => future_shape(Some(output)),
            None => Shape::Future,
        };
        return Ok((shape, future.is_some_and(is_result)));
    }
    if is_unit(ty) {
        return Ok((Shape::Unit, false));
    }
    if is_result(ty) {
        let ok_is_unit = first_type_argument(ty).is_some_and(is_unit);
        let shape = if ok_is_unit { Shape::Unit } else { Shape::Value };
        return Ok((shape, true));
    }
    if let Type::ImplTrait(_) = ty {
        return Err(syn::Error::new(
            ty.span(),
            "tool methods may only return `impl Future` or `impl Stream`",
        ));
    }
    Ok((Shape::Value, false))
}

/// Futures whose output is `()` or `Result<(), _>` are void tools.
fn future_shape(output: Option<&Type>) -> Shape {
    if output.is_none_or(yields_unit) {
        Shape::UnitFuture
    } else {
        Shape::Future
    }
}

fn yields_unit(ty: &Type) -> bool {
    is_unit(ty) || (is_result(ty) && first_type_argument(ty).is_some_and(is_unit))
}

fn unwrap_group(ty: &Type) -> &Type {
    match ty {
        Type::Paren(inner) => unwrap_group(&inner.elem),
        Type::Group(inner) => unwrap_group(&inner.elem),
        other => other,
    }
}

fn is_unit(ty: &Type) -> bool {
    matches!(unwrap_group(ty), Type::Tuple(tuple) if tuple.elems.is_empty())
}

fn last_segment_ident(ty: &Type) -> Option<String> {
    match unwrap_group(ty) {
        Type::Path(path) => path.path.segments.last().map(|segment| segment.ident.to_string()),
        _ => None,
    }
}

fn is_result(ty: &Type) -> bool {
    last_segment_ident(ty).is_some_and(|ident| ident == "Result")
}

fn first_type_argument(ty: &Type) -> Option<&Type> {
    type_arguments(ty).next()
}

fn type_arguments(ty: &Type) -> impl Iterator<Item = &Type> {
    let arguments = match unwrap_group(ty) {
        Type::Path(path) => path.path.segments.last().map(|segment| &segment.arguments),
        _ => None,
    };
    arguments
        .into_iter()
        .filter_map(|arguments| match arguments {
            PathArguments::AngleBracketed(angle) => Some(angle.args.iter()),
            _ => None,
        })
        .flatten()
        .filter_map(|argument| match argument {
            GenericArgument::Type(ty) => Some(ty),
            _ => None,
        })
}

fn trait_bounds<'a>(
    bounds: impl IntoIterator<Item = &'a TypeParamBound>,
) -> impl Iterator<Item = &'a syn::PathSegment> {
    bounds.into_iter().filter_map(|bound| match bound {
        TypeParamBound::Trait(bound) => bound.path.segments.last(),
        _ => None,
    })
}

/// Returns `Some(output)` when `ty` is a future; `output` is `None` when it
/// cannot be read from the type.
fn future_output(ty: &Type) -> Option<Option<&Type>> {
    match unwrap_group(ty) {
        Type::ImplTrait(bounds) => trait_bounds(&bounds.bounds)
            .find(|segment| segment.ident == "Future")
            .map(output_binding),
        Type::TraitObject(bounds) => trait_bounds(&bounds.bounds)
            .find(|segment| segment.ident == "Future")
            .map(output_binding),
        Type::Path(path) => {
            let segment = path.path.segments.last()?;
            if segment.ident == "BoxFuture" || segment.ident == "LocalBoxFuture" {
                Some(type_arguments(ty).last())
            } else if segment.ident == "Pin" || segment.ident == "Box" {
                future_output(first_type_argument(ty)?)
            } else {
                None
            }
        }
        _ => None,
    }
}

fn output_binding(segment: &syn::PathSegment) -> Option<&Type> {
    let PathArguments::AngleBracketed(angle) = &segment.arguments else {
        return None;
    };
    angle.args.iter().find_map(|argument| match argument {
        GenericArgument::AssocType(assoc) if assoc.ident == "Output" => Some(&assoc.ty),
        _ => None,
    })
}

/// Matches `impl Stream`, `dyn Stream`, `BoxStream` and boxed or pinned
/// forms of these. Concrete types such as `TcpStream` are plain values.
fn is_stream(ty: &Type) -> bool {
    let stream_trait =
        |segment: &syn::PathSegment| segment.ident == "Stream" || segment.ident == "TryStream";

    match unwrap_group(ty) {
        Type::ImplTrait(bounds) => trait_bounds(&bounds.bounds).any(stream_trait),
        Type::TraitObject(bounds) => trait_bounds(&bounds.bounds).any(stream_trait),
        Type::Path(path) => match path.path.segments.last() {
            Some(segment) if segment.ident == "Pin" || segment.ident == "Box" => {
                first_type_argument(ty).is_some_and(is_stream)
            }
            Some(segment) => segment.ident == "BoxStream" || segment.ident == "LocalBoxStream",
            None => false,
        },
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape(sig: syn::Signature) -> (Shape, bool) {
        classify(&sig).unwrap()
    }

    #[test]
    fn async_unit_methods_are_void_futures() {
        assert_eq!(shape(parse_quote!(async fn log(&self, m: String))), (Shape::UnitFuture, false));
        assert_eq!(shape(parse_quote!(async fn log(&self) -> ())), (Shape::UnitFuture, false));
        assert_eq!(
            shape(parse_quote!(async fn save(&self) -> anyhow::Result<()>)),
            (Shape::UnitFuture, true)
        );
        assert_eq!(
            shape(parse_quote!(fn save(&self) -> impl Future<Output = ()>)),
            (Shape::UnitFuture, false)
        );
        assert_eq!(shape(parse_quote!(async fn get(&self) -> u32)), (Shape::Future, false));
        assert_eq!(
            shape(parse_quote!(fn get(&self) -> BoxFuture<'static, String>)),
            (Shape::Future, false)
        );
    }

    #[test]
    fn only_stream_shapes_are_streams() {
        assert_eq!(
            shape(parse_quote!(fn feed(&self) -> BoxStream<'static, u64>)),
            (Shape::Stream, false)
        );
        assert_eq!(
            shape(parse_quote!(fn feed(&self) -> impl Stream<Item = u64>)),
            (Shape::Stream, false)
        );
        assert_eq!(
            shape(parse_quote!(fn feed(&self) -> Pin<Box<dyn Stream<Item = u64> + Send>>)),
            (Shape::Stream, false)
        );
        assert_eq!(shape(parse_quote!(fn open(&self) -> TcpStream)), (Shape::Value, false));
        assert_eq!(shape(parse_quote!(fn open(&self) -> ByteStream)), (Shape::Value, false));
    }
}
